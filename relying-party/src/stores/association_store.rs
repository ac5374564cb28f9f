//! Handle-keyed association table.
//!
//! [`AssociationStore`] holds the associations negotiated with a single
//! provider. Every operation takes the table lock for its whole duration, so
//! readers never observe a half-applied mutation and [`AssociationStore::best`]
//! always returns a self-consistent snapshot.

use crate::association::{Association, AssociationHandle};
use crate::environment::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Concurrent table of associations keyed by handle.
///
/// `get` returns entries as stored, expired or not; callers that care about
/// freshness check [`Association::is_expired_at`] themselves or sweep with
/// [`AssociationStore::clear_expired`] first.
#[derive(Clone)]
pub struct AssociationStore {
    entries: Arc<Mutex<HashMap<AssociationHandle, Association>>>,
    clock: Arc<dyn Clock>,
}

impl AssociationStore {
    /// Create an empty store that judges expiry with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store with an injected clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    // Every critical section leaves the map in a valid state, so a poisoned
    // lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, HashMap<AssociationHandle, Association>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an association, replacing any entry with the same handle.
    pub fn set(&self, association: Association) {
        let mut entries = self.lock();
        if entries
            .insert(association.handle().clone(), association)
            .is_some()
        {
            tracing::debug!("Replaced association with matching handle");
        }
    }

    /// Look up an association by handle.
    #[must_use]
    pub fn get(&self, handle: &AssociationHandle) -> Option<Association> {
        self.lock().get(handle).cloned()
    }

    /// Remove an association. Returns `true` iff it existed.
    pub fn remove(&self, handle: &AssociationHandle) -> bool {
        self.lock().remove(handle).is_some()
    }

    /// Remove every expired association and return how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, association| !association.is_expired_at(now));
        before - entries.len()
    }

    /// Snapshot of all associations, most recently issued first.
    ///
    /// Expired entries are included.
    #[must_use]
    pub fn best(&self) -> Vec<Association> {
        let mut snapshot: Vec<Association> = self.lock().values().cloned().collect();
        // Handle as tie-breaker keeps the order deterministic.
        snapshot.sort_by(|a, b| {
            b.issued()
                .cmp(&a.issued())
                .then_with(|| a.handle().cmp(b.handle()))
        });
        snapshot
    }

    /// Number of stored associations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for AssociationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AssociationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
