//! Relying-party environment.
//!
//! This module defines the environment type used to inject the external
//! collaborators (discovery, association negotiation, association storage and
//! time) into the relying party.

use crate::providers::{AssociationNegotiator, AssociationRepository, IdentifierDiscovery};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Relying-party environment.
///
/// Contains all external dependencies needed by the relying party.
/// `associations` is optional: without a backing store every request runs
/// in dumb mode.
#[derive(Clone)]
pub struct RelyingPartyEnvironment {
    /// Identifier discovery (Yadis/XRDS/HTML in production).
    pub discovery: Arc<dyn IdentifierDiscovery>,

    /// Association negotiation (Diffie-Hellman exchange in production).
    pub negotiator: Arc<dyn AssociationNegotiator>,

    /// Provider-keyed association storage.
    pub associations: Option<Arc<dyn AssociationRepository>>,

    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl RelyingPartyEnvironment {
    /// Create a new environment with a backing association store and the
    /// system clock.
    #[must_use]
    pub fn new(
        discovery: Arc<dyn IdentifierDiscovery>,
        negotiator: Arc<dyn AssociationNegotiator>,
        associations: Arc<dyn AssociationRepository>,
    ) -> Self {
        Self {
            discovery,
            negotiator,
            associations: Some(associations),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create an environment without an association store (dumb mode only).
    #[must_use]
    pub fn stateless(
        discovery: Arc<dyn IdentifierDiscovery>,
        negotiator: Arc<dyn AssociationNegotiator>,
    ) -> Self {
        Self {
            discovery,
            negotiator,
            associations: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for RelyingPartyEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelyingPartyEnvironment")
            .field("has_association_store", &self.associations.is_some())
            .finish_non_exhaustive()
    }
}
