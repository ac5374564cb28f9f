//! Identifiers and discovered provider endpoints.

use crate::constants::IDENTIFIER_SELECT;
use crate::error::{RelyingPartyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Protocol version advertised by a provider endpoint.
///
/// Versions are totally ordered so a minimum version can be enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// OpenID 1.0.
    V1_0,

    /// OpenID 1.1.
    V1_1,

    /// OpenID 2.0.
    V2_0,
}

impl ProtocolVersion {
    /// Whether this version understands claimed identifiers distinct from
    /// the local identifier (and therefore directed identity).
    #[must_use]
    pub const fn supports_claimed_id(self) -> bool {
        matches!(self, Self::V2_0)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_0 => f.write_str("1.0"),
            Self::V1_1 => f.write_str("1.1"),
            Self::V2_0 => f.write_str("2.0"),
        }
    }
}

/// User-supplied identifier, before discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a user-supplied identifier.
    ///
    /// Surrounding whitespace is trimmed; normalization into a URL or XRI is
    /// left to discovery.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::InvalidIdentifier`] if the identifier is
    /// blank or contains whitespace or control characters.
    ///
    /// # Examples
    ///
    /// ```
    /// # use openid_relying_party::Identifier;
    /// assert_eq!(Identifier::parse("  alice.example ").unwrap().as_str(), "alice.example");
    /// assert!(Identifier::parse("   ").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RelyingPartyError::InvalidIdentifier {
                reason: "identifier is empty".to_string(),
            });
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RelyingPartyError::InvalidIdentifier {
                reason: "identifier contains whitespace or control characters".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key under which associations with a provider are cached.
///
/// Several claimed identifiers may share one provider, so this is derived
/// from the provider endpoint and protocol version, not from the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderDescription {
    /// Provider endpoint URI.
    pub uri: Url,

    /// Protocol version spoken at that endpoint.
    pub version: ProtocolVersion,
}

impl ProviderDescription {
    /// Create a provider description.
    #[must_use]
    pub const fn new(uri: Url, version: ProtocolVersion) -> Self {
        Self { uri, version }
    }
}

impl fmt::Display for ProviderDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (OpenID {})", self.uri, self.version)
    }
}

/// Provider endpoint produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// Identifier the user will be asserted as. `None` for OP identifiers.
    pub claimed_identifier: Option<String>,

    /// Provider-local identifier (delegate), if different from the claimed one.
    pub local_identifier: Option<String>,

    /// Provider endpoint URI.
    pub provider_uri: Url,

    /// Protocol version spoken at the endpoint.
    pub protocol_version: ProtocolVersion,

    /// Whether the user supplied the provider's own identifier, letting the
    /// provider pick the identity.
    pub is_op_identifier: bool,

    /// Association cache key.
    pub provider_description: ProviderDescription,

    /// Identifier as typed by the user, if discovery recorded it.
    pub user_supplied_identifier: Option<String>,
}

impl ProviderEndpoint {
    /// Create an endpoint with no identifiers attached.
    #[must_use]
    pub fn new(provider_uri: Url, protocol_version: ProtocolVersion) -> Self {
        Self {
            claimed_identifier: None,
            local_identifier: None,
            provider_description: ProviderDescription::new(provider_uri.clone(), protocol_version),
            provider_uri,
            protocol_version,
            is_op_identifier: false,
            user_supplied_identifier: None,
        }
    }

    /// Attach a claimed identifier.
    #[must_use]
    pub fn with_claimed_identifier(mut self, claimed: impl Into<String>) -> Self {
        self.claimed_identifier = Some(claimed.into());
        self
    }

    /// Attach a provider-local identifier.
    #[must_use]
    pub fn with_local_identifier(mut self, local: impl Into<String>) -> Self {
        self.local_identifier = Some(local.into());
        self
    }

    /// Mark the endpoint as an OP identifier endpoint.
    #[must_use]
    pub fn as_op_identifier(mut self) -> Self {
        self.is_op_identifier = true;
        self.claimed_identifier = None;
        self.local_identifier = None;
        self
    }

    /// Record the identifier the user typed.
    #[must_use]
    pub fn with_user_supplied_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.user_supplied_identifier = Some(identifier.into());
        self
    }

    /// Whether the provider chooses the identity.
    #[must_use]
    pub fn is_directed_identity(&self) -> bool {
        let claimed = self.claimed_identifier.as_deref();
        self.is_op_identifier || claimed.is_none_or(|c| c == IDENTIFIER_SELECT)
    }

    /// Identifier the provider should authenticate: the local identifier
    /// when delegating, otherwise the claimed identifier.
    #[must_use]
    pub fn provider_local_identifier(&self) -> Option<&str> {
        self.local_identifier
            .as_deref()
            .or(self.claimed_identifier.as_deref())
    }
}
