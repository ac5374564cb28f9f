//! Provider-keyed association storage trait.
//!
//! Associations are cached per provider so that every claimed identifier
//! served by the same provider reuses one shared secret.
//!
//! # Implementation
//!
//! **In-process**: [`InMemoryAssociationRepository`](crate::stores::InMemoryAssociationRepository)
//! keeps one [`AssociationStore`](crate::stores::AssociationStore) per provider.
//! **Durable**: serialize [`Association`] (it implements `serde`) into a
//! shared cache or database so several relying-party instances share secrets.
//!
//! # Example
//!
//! ```ignore
//! repository.store(&provider, association)?;
//!
//! // Newest first; callers pick the first one that is still fresh enough.
//! let candidates = repository.best(&provider)?;
//! ```

use crate::association::{Association, AssociationHandle};
use crate::endpoint::ProviderDescription;
use crate::error::Result;

/// Association storage keyed by provider, then by handle.
///
/// # Consistency
///
/// Implementations must make every method atomic with respect to the others:
/// a `best` snapshot taken while another caller stores or removes entries
/// must contain neither duplicates nor half-written entries.
pub trait AssociationRepository: Send + Sync {
    /// Store an association for `provider`, replacing any entry with the same
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage fails.
    fn store(&self, provider: &ProviderDescription, association: Association) -> Result<()>;

    /// All associations held for `provider`, most recently issued first.
    ///
    /// Expired entries may be included; callers filter by remaining
    /// lifetime.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage fails.
    fn best(&self, provider: &ProviderDescription) -> Result<Vec<Association>>;

    /// Look up one association by handle.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage fails (not found is `Ok(None)`).
    fn get(
        &self,
        provider: &ProviderDescription,
        handle: &AssociationHandle,
    ) -> Result<Option<Association>>;

    /// Remove one association. Returns `true` iff it existed.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage fails.
    fn remove(&self, provider: &ProviderDescription, handle: &AssociationHandle) -> Result<bool>;

    /// Remove expired associations for every provider and return how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage fails.
    fn clear_expired(&self) -> Result<usize>;
}
