//! Mock association negotiator for testing.

use crate::association::{Association, AssociationHandle};
use crate::endpoint::ProviderDescription;
use crate::environment::Clock;
use crate::error::{RelyingPartyError, Result};
use crate::providers::AssociationNegotiator;
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

#[derive(Debug, Default)]
struct NegotiatorState {
    failing: HashSet<Url>,
    calls: HashMap<Url, usize>,
}

/// Mock association negotiator.
///
/// Issues random HMAC-SHA256 sized secrets with a UUID-based handle. Providers
/// can be switched to failure mode, and every call is counted per provider
/// URI so tests can assert how often negotiation was attempted.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone)]
pub struct MockAssociationNegotiator {
    state: Arc<Mutex<NegotiatorState>>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
}

impl MockAssociationNegotiator {
    /// Create a negotiator that succeeds for every provider.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(NegotiatorState::default())),
            clock,
            lifetime: Duration::hours(2),
        }
    }

    /// Set the lifetime of issued associations.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    fn lock(&self) -> MutexGuard<'_, NegotiatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make negotiation with `provider_uri` fail.
    pub fn fail_for(&self, provider_uri: &Url) {
        self.lock().failing.insert(provider_uri.clone());
    }

    /// Let negotiation with `provider_uri` succeed again.
    pub fn recover(&self, provider_uri: &Url) {
        self.lock().failing.remove(provider_uri);
    }

    /// Number of negotiation attempts made with `provider_uri`.
    #[must_use]
    pub fn calls_for(&self, provider_uri: &Url) -> usize {
        self.lock().calls.get(provider_uri).copied().unwrap_or(0)
    }

    /// Total number of negotiation attempts.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }
}

impl AssociationNegotiator for MockAssociationNegotiator {
    fn negotiate(&self, provider: &ProviderDescription) -> Result<Association> {
        {
            let mut state = self.lock();
            *state.calls.entry(provider.uri.clone()).or_insert(0) += 1;
            if state.failing.contains(&provider.uri) {
                return Err(RelyingPartyError::NegotiationFailed(format!(
                    "{} refused association",
                    provider.uri
                )));
            }
        }

        let handle = AssociationHandle::new(format!("{{HMAC-SHA256}}{}", uuid::Uuid::new_v4()))?;
        let secret: [u8; 32] = rand::random();
        Ok(Association::new(handle, secret.to_vec(), self.clock.now(), self.lifetime))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::endpoint::ProtocolVersion;
    use crate::mocks::test_clock;

    #[test]
    fn test_counts_and_failure_switch() {
        let clock = test_clock();
        let negotiator = MockAssociationNegotiator::new(Arc::new(clock.clone()));
        let uri = Url::parse("https://op.example/").unwrap();
        let provider = ProviderDescription::new(uri.clone(), ProtocolVersion::V2_0);

        let assoc = negotiator.negotiate(&provider).unwrap();
        assert_eq!(assoc.secret().len(), 32);
        assert_eq!(assoc.issued(), clock.now());

        negotiator.fail_for(&uri);
        assert!(negotiator.negotiate(&provider).is_err());

        negotiator.recover(&uri);
        assert!(negotiator.negotiate(&provider).is_ok());
        assert_eq!(negotiator.calls_for(&uri), 3);
    }

    #[test]
    fn test_handles_are_unique() {
        let negotiator = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let provider = ProviderDescription::new(
            Url::parse("https://op.example/").unwrap(),
            ProtocolVersion::V2_0,
        );
        let a = negotiator.negotiate(&provider).unwrap();
        let b = negotiator.negotiate(&provider).unwrap();
        assert_ne!(a.handle(), b.handle());
    }
}
