//! Association manager.
//!
//! Decides whether an existing association can be reused for a provider and,
//! when asked to, negotiates and stores a new one. Negotiation and storage
//! failures never reach the caller: they are logged and reported as "no
//! association", which sends the request down the dumb-mode path.

use crate::association::Association;
use crate::endpoint::ProviderDescription;
use crate::environment::Clock;
use crate::providers::{AssociationNegotiator, AssociationRepository};
use chrono::Duration;
use std::sync::Arc;

/// Orchestrates association reuse and creation over a backing repository.
#[derive(Clone)]
pub struct AssociationManager {
    repository: Option<Arc<dyn AssociationRepository>>,
    negotiator: Arc<dyn AssociationNegotiator>,
    clock: Arc<dyn Clock>,
    minimum_lifetime: Duration,
}

impl AssociationManager {
    /// Create a manager.
    ///
    /// With `repository` set to `None` the manager never negotiates and
    /// every lookup returns `None`.
    #[must_use]
    pub fn new(
        repository: Option<Arc<dyn AssociationRepository>>,
        negotiator: Arc<dyn AssociationNegotiator>,
        clock: Arc<dyn Clock>,
        minimum_lifetime: Duration,
    ) -> Self {
        Self {
            repository,
            negotiator,
            clock,
            minimum_lifetime,
        }
    }

    /// Whether a backing association store is configured.
    #[must_use]
    pub fn has_association_store(&self) -> bool {
        self.repository.is_some()
    }

    /// Newest stored association for `provider` with at least the minimum
    /// remaining lifetime. Never negotiates.
    #[must_use]
    pub fn get_existing_association(&self, provider: &ProviderDescription) -> Option<Association> {
        let repository = self.repository.as_ref()?;
        let candidates = match repository.best(provider) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    provider = %provider.uri,
                    error = %e,
                    "Association store lookup failed"
                );
                return None;
            }
        };

        let now = self.clock.now();
        let found = candidates.into_iter().find(|association| {
            !association.is_expired_at(now)
                && association.time_until_expiry(now) >= self.minimum_lifetime
        });

        if let Some(association) = &found {
            tracing::debug!(
                provider = %provider.uri,
                handle = %association.handle(),
                "Reusing existing association"
            );
        }
        found
    }

    /// Existing association for `provider`, or a freshly negotiated one.
    ///
    /// Negotiation is attempted at most once per call and never retried.
    /// Returns `None` on any failure, including a new association whose
    /// lifetime is below the minimum (it is not stored).
    #[must_use]
    pub fn get_or_create_association(&self, provider: &ProviderDescription) -> Option<Association> {
        let repository = self.repository.as_ref()?;
        if let Some(existing) = self.get_existing_association(provider) {
            return Some(existing);
        }

        let association = match self.negotiator.negotiate(provider) {
            Ok(association) => association,
            Err(e) => {
                tracing::warn!(
                    provider = %provider.uri,
                    error = %e,
                    "Failed to create association"
                );
                return None;
            }
        };

        // Only associations that later lookups accept are stored.
        let remaining = association.time_until_expiry(self.clock.now());
        if remaining < self.minimum_lifetime {
            tracing::warn!(
                provider = %provider.uri,
                remaining_secs = remaining.num_seconds(),
                minimum_secs = self.minimum_lifetime.num_seconds(),
                "New association is shorter-lived than the minimum lifetime, discarding"
            );
            return None;
        }

        if let Err(e) = repository.store(provider, association.clone()) {
            tracing::warn!(
                provider = %provider.uri,
                error = %e,
                "Failed to store new association"
            );
            return None;
        }

        tracing::info!(
            provider = %provider.uri,
            handle = %association.handle(),
            expires = %association.expires(),
            "Created association"
        );
        Some(association)
    }

    /// Sweep expired associations from the backing store.
    ///
    /// Returns the number removed (0 without a store or on store failure).
    pub fn clear_expired(&self) -> usize {
        let Some(repository) = self.repository.as_ref() else {
            return 0;
        };
        repository.clear_expired().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to clear expired associations");
            0
        })
    }
}

impl std::fmt::Debug for AssociationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationManager")
            .field("has_association_store", &self.has_association_store())
            .field("minimum_lifetime", &self.minimum_lifetime)
            .finish_non_exhaustive()
    }
}
