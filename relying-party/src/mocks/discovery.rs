//! Mock identifier discovery for testing.

use crate::endpoint::{Identifier, ProviderEndpoint};
use crate::error::{RelyingPartyError, Result};
use crate::providers::IdentifierDiscovery;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Mock discovery service.
///
/// Returns the endpoints registered for an identifier. Unknown identifiers
/// fail discovery, like an unreachable identifier page would.
#[derive(Debug, Clone, Default)]
pub struct MockDiscovery {
    endpoints: Arc<Mutex<HashMap<String, Vec<ProviderEndpoint>>>>,
}

impl MockDiscovery {
    /// Create a discovery service with no known identifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the endpoints discovered for `identifier`.
    ///
    /// Each endpoint gets `identifier` as its user-supplied identifier unless
    /// one is already set.
    pub fn register(&self, identifier: &str, endpoints: Vec<ProviderEndpoint>) {
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| {
                if endpoint.user_supplied_identifier.is_some() {
                    endpoint
                } else {
                    endpoint.with_user_supplied_identifier(identifier)
                }
            })
            .collect();
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier.to_string(), endpoints);
    }

    /// Builder form of [`MockDiscovery::register`].
    #[must_use]
    pub fn with(self, identifier: &str, endpoints: Vec<ProviderEndpoint>) -> Self {
        self.register(identifier, endpoints);
        self
    }
}

impl IdentifierDiscovery for MockDiscovery {
    fn discover(&self, identifier: &Identifier) -> Result<Vec<ProviderEndpoint>> {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier.as_str())
            .cloned()
            .ok_or_else(|| {
                RelyingPartyError::DiscoveryFailed(format!("no service found for {identifier}"))
            })
    }
}
