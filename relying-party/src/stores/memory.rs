//! In-process association repository.

use crate::association::{Association, AssociationHandle};
use crate::endpoint::ProviderDescription;
use crate::environment::{Clock, SystemClock};
use crate::error::Result;
use crate::providers::AssociationRepository;
use crate::stores::AssociationStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory [`AssociationRepository`].
///
/// Holds one [`AssociationStore`] per provider. The provider map has its own
/// lock; per-provider tables are created on first store and shared by clone,
/// so operations on different providers only contend briefly on the map.
///
/// Associations do not survive a restart. Use a durable repository when
/// several relying-party instances must share secrets.
#[derive(Clone)]
pub struct InMemoryAssociationRepository {
    providers: Arc<Mutex<HashMap<ProviderDescription, AssociationStore>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAssociationRepository {
    /// Create an empty repository using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty repository with an injected clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            providers: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProviderDescription, AssociationStore>> {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn table(&self, provider: &ProviderDescription) -> Option<AssociationStore> {
        self.lock().get(provider).cloned()
    }

    /// Total number of associations across all providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values().map(AssociationStore::len).sum()
    }

    /// Whether no associations are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAssociationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryAssociationRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAssociationRepository")
            .field("providers", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl AssociationRepository for InMemoryAssociationRepository {
    fn store(&self, provider: &ProviderDescription, association: Association) -> Result<()> {
        tracing::debug!(
            provider = %provider.uri,
            handle = %association.handle(),
            expires = %association.expires(),
            "Storing association"
        );

        // Map lock held across the insert so `clear_expired` cannot drop the
        // table between lookup and insert.
        self.lock()
            .entry(provider.clone())
            .or_insert_with(|| AssociationStore::with_clock(Arc::clone(&self.clock)))
            .set(association);
        Ok(())
    }

    fn best(&self, provider: &ProviderDescription) -> Result<Vec<Association>> {
        Ok(self
            .table(provider)
            .map(|table| table.best())
            .unwrap_or_default())
    }

    fn get(
        &self,
        provider: &ProviderDescription,
        handle: &AssociationHandle,
    ) -> Result<Option<Association>> {
        Ok(self.table(provider).and_then(|table| table.get(handle)))
    }

    fn remove(&self, provider: &ProviderDescription, handle: &AssociationHandle) -> Result<bool> {
        let removed = self
            .table(provider)
            .is_some_and(|table| table.remove(handle));
        if removed {
            tracing::debug!(provider = %provider.uri, handle = %handle, "Removed association");
        }
        Ok(removed)
    }

    fn clear_expired(&self) -> Result<usize> {
        let mut providers = self.lock();
        let removed: usize = providers
            .values()
            .map(AssociationStore::clear_expired)
            .sum();
        providers.retain(|_, table| !table.is_empty());

        if removed > 0 {
            tracing::info!(removed, "Cleared expired associations");
        }
        Ok(removed)
    }
}
