//! Relying-party configuration.
//!
//! Security settings and endpoint selection policy. Values should be provided
//! by the application, not hardcoded.

use crate::endpoint::{ProtocolVersion, ProviderEndpoint};
use chrono::Duration;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied endpoint acceptance predicate.
pub type EndpointPredicate = Arc<dyn Fn(&ProviderEndpoint) -> bool + Send + Sync>;

/// Caller-supplied total order over endpoints (most preferred first).
pub type EndpointComparator =
    Arc<dyn Fn(&ProviderEndpoint, &ProviderEndpoint) -> Ordering + Send + Sync>;

/// Security settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecuritySettings {
    /// Endpoints advertising an older protocol version are dropped.
    ///
    /// Default: 1.0 (accept all)
    pub minimum_protocol_version: ProtocolVersion,

    /// Every request must carry an association.
    ///
    /// Endpoints whose association cannot be formed yield no request, and
    /// building a request without an association fails.
    ///
    /// Default: false
    pub require_association: bool,

    /// Only HTTPS provider endpoints (and HTTPS claimed identifiers) are used.
    ///
    /// Default: false
    pub require_ssl: bool,

    /// Cached associations with less remaining lifetime than this are not
    /// reused.
    ///
    /// Default: 0 seconds
    pub minimum_association_lifetime: Duration,
}

impl SecuritySettings {
    /// Create settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            minimum_protocol_version: ProtocolVersion::V1_0,
            require_association: false,
            require_ssl: false,
            minimum_association_lifetime: Duration::zero(),
        }
    }

    /// Set minimum protocol version.
    #[must_use]
    pub const fn with_minimum_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.minimum_protocol_version = version;
        self
    }

    /// Require an association for every request.
    #[must_use]
    pub const fn with_require_association(mut self, require: bool) -> Self {
        self.require_association = require;
        self
    }

    /// Require HTTPS endpoints.
    #[must_use]
    pub const fn with_require_ssl(mut self, require: bool) -> Self {
        self.require_ssl = require;
        self
    }

    /// Set minimum remaining lifetime for reusing an association.
    #[must_use]
    pub const fn with_minimum_association_lifetime(mut self, lifetime: Duration) -> Self {
        self.minimum_association_lifetime = lifetime;
        self
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Relying-party configuration.
#[derive(Clone)]
pub struct RelyingPartyConfig {
    /// Security settings.
    pub security: SecuritySettings,

    /// Extra endpoint filter applied after the built-in checks.
    ///
    /// Default: accept all
    pub endpoint_filter: Option<EndpointPredicate>,

    /// Endpoint preference order.
    ///
    /// Default: [`default_endpoint_order`]
    pub endpoint_order: EndpointComparator,
}

impl RelyingPartyConfig {
    /// Create configuration with the given security settings.
    #[must_use]
    pub fn new(security: SecuritySettings) -> Self {
        Self {
            security,
            endpoint_filter: None,
            endpoint_order: Arc::new(default_endpoint_order),
        }
    }

    /// Set endpoint filter.
    #[must_use]
    pub fn with_endpoint_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ProviderEndpoint) -> bool + Send + Sync + 'static,
    {
        self.endpoint_filter = Some(Arc::new(filter));
        self
    }

    /// Set endpoint order.
    #[must_use]
    pub fn with_endpoint_order<C>(mut self, order: C) -> Self
    where
        C: Fn(&ProviderEndpoint, &ProviderEndpoint) -> Ordering + Send + Sync + 'static,
    {
        self.endpoint_order = Arc::new(order);
        self
    }
}

impl Default for RelyingPartyConfig {
    fn default() -> Self {
        Self::new(SecuritySettings::default())
    }
}

impl fmt::Debug for RelyingPartyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelyingPartyConfig")
            .field("security", &self.security)
            .field("endpoint_filter", &self.endpoint_filter.is_some())
            .finish_non_exhaustive()
    }
}

/// Default endpoint preference: OP identifier endpoints first, then newer
/// protocol versions. Equal endpoints keep discovery order.
#[must_use]
pub fn default_endpoint_order(a: &ProviderEndpoint, b: &ProviderEndpoint) -> Ordering {
    b.is_op_identifier
        .cmp(&a.is_op_identifier)
        .then_with(|| b.protocol_version.cmp(&a.protocol_version))
}
