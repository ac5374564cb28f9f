//! Identifier discovery trait.

use crate::endpoint::{Identifier, ProviderEndpoint};
use crate::error::Result;

/// Resolves a user-supplied identifier into candidate provider endpoints.
///
/// # Implementation Notes
///
/// - Yadis/XRDS for URL and XRI identifiers, HTML `<link>` discovery as a
///   fallback
/// - Populate [`ProviderEndpoint::user_supplied_identifier`] with the
///   identifier the user typed
/// - Return endpoints in document priority order; the relying party sorts
///   them again with its own comparator
pub trait IdentifierDiscovery: Send + Sync {
    /// Discover provider endpoints for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::DiscoveryFailed`](crate::RelyingPartyError::DiscoveryFailed)
    /// if the identifier cannot be resolved. The relying party treats this
    /// as an empty endpoint set.
    fn discover(&self, identifier: &Identifier) -> Result<Vec<ProviderEndpoint>>;
}
