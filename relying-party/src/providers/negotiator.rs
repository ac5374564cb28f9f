//! Association negotiation trait.

use crate::association::Association;
use crate::endpoint::ProviderDescription;
use crate::error::Result;

/// Negotiates a new shared-secret association with a provider.
///
/// # Implementation Notes
///
/// - Perform the association request over the transport of your choice
/// - Run the Diffie-Hellman exchange and decrypt the MAC key
/// - Honor the provider's `expires_in` when building the [`Association`]
///
/// The core treats this as one synchronous call: it is never retried within
/// a single lookup, and every error collapses to "no association".
pub trait AssociationNegotiator: Send + Sync {
    /// Establish an association with `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::NegotiationFailed`](crate::RelyingPartyError::NegotiationFailed)
    /// if:
    /// - The provider is unreachable
    /// - The provider refuses or supports no common association type
    /// - The response is malformed
    fn negotiate(&self, provider: &ProviderDescription) -> Result<Association>;
}
