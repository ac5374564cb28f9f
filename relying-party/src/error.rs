//! Error types for relying-party operations.

use thiserror::Error;

/// Result type alias for relying-party operations.
pub type Result<T> = std::result::Result<T, RelyingPartyError>;

/// Error taxonomy for the relying-party core.
///
/// Only precondition and security errors ever reach the caller of
/// [`RelyingParty::create`](crate::RelyingParty::create) or
/// [`AuthenticationRequest::build`](crate::AuthenticationRequest::build).
/// Collaborator failures (discovery, negotiation, storage) are produced by
/// the provider traits and absorbed by the core, which logs them and
/// degrades to fewer endpoints or dumb mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelyingPartyError {
    // ═══════════════════════════════════════════════════════════
    // Precondition Errors
    // ═══════════════════════════════════════════════════════════
    /// The user-supplied identifier is empty or malformed.
    #[error("Invalid identifier: {reason}")]
    InvalidIdentifier {
        /// Reason for rejection
        reason: String,
    },

    /// A URL argument could not be parsed.
    #[error("Invalid {field} URL: {reason}")]
    InvalidUrl {
        /// Which argument was malformed (e.g. "return_to")
        field: &'static str,
        /// Parser message
        reason: String,
    },

    /// The realm is not a valid realm URL.
    #[error("Invalid realm: {reason}")]
    InvalidRealm {
        /// Reason for rejection
        reason: String,
    },

    /// The return-to URL does not fall under the declared realm.
    #[error("Return-to URL {return_to} is not within realm {realm}")]
    ReturnToOutsideRealm {
        /// Offending return-to URL
        return_to: String,
        /// Declared realm
        realm: String,
    },

    /// A callback argument with this key was already added to the request.
    #[error("Callback argument '{key}' was already added")]
    DuplicateCallbackArgument {
        /// Duplicated key
        key: String,
    },

    /// Callback argument keys must be non-empty.
    #[error("Callback argument key must not be empty")]
    EmptyCallbackArgumentKey,

    /// The key is reserved for the relying party's own use.
    #[error("Callback argument '{key}' is reserved")]
    ReservedCallbackArgument {
        /// Reserved key
        key: String,
    },

    /// Callback arguments need an association store to be protected.
    #[error("Callback arguments require an association store")]
    CallbackArgumentsUnsupported,

    /// Association handle violates the handle grammar.
    #[error("Invalid association handle: {reason}")]
    InvalidAssociationHandle {
        /// Reason for rejection
        reason: String,
    },

    /// Relying-party configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ═══════════════════════════════════════════════════════════
    // Security Policy
    // ═══════════════════════════════════════════════════════════
    /// Security settings demand an association but none is available.
    #[error("An association with {provider} is required but not available")]
    AssociationRequired {
        /// Provider endpoint URI
        provider: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Collaborator Failures
    // ═══════════════════════════════════════════════════════════
    /// Identifier discovery failed.
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Association negotiation with a provider failed.
    #[error("Association negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Backing association store failed.
    #[error("Association store error: {0}")]
    StoreError(String),
}

impl RelyingPartyError {
    /// Returns `true` if the error reports caller misuse.
    ///
    /// # Examples
    ///
    /// ```
    /// # use openid_relying_party::RelyingPartyError;
    /// assert!(RelyingPartyError::EmptyCallbackArgumentKey.is_precondition_error());
    /// assert!(!RelyingPartyError::StoreError("down".into()).is_precondition_error());
    /// ```
    #[must_use]
    pub const fn is_precondition_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier { .. }
                | Self::InvalidUrl { .. }
                | Self::InvalidRealm { .. }
                | Self::ReturnToOutsideRealm { .. }
                | Self::DuplicateCallbackArgument { .. }
                | Self::EmptyCallbackArgumentKey
                | Self::ReservedCallbackArgument { .. }
                | Self::CallbackArgumentsUnsupported
                | Self::InvalidAssociationHandle { .. }
                | Self::Configuration(_)
        )
    }

    /// Returns `true` if the error reflects a security policy decision.
    ///
    /// # Examples
    ///
    /// ```
    /// # use openid_relying_party::RelyingPartyError;
    /// let err = RelyingPartyError::AssociationRequired { provider: "https://op.example".into() };
    /// assert!(err.is_security_issue());
    /// assert!(!RelyingPartyError::EmptyCallbackArgumentKey.is_security_issue());
    /// ```
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(
            self,
            Self::AssociationRequired { .. }
                | Self::ReturnToOutsideRealm { .. }
                | Self::CallbackArgumentsUnsupported
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_failures_are_not_preconditions() {
        for err in [
            RelyingPartyError::DiscoveryFailed("timeout".into()),
            RelyingPartyError::NegotiationFailed("refused".into()),
            RelyingPartyError::StoreError("io".into()),
        ] {
            assert!(!err.is_precondition_error());
            assert!(!err.is_security_issue());
        }
    }

    #[test]
    fn test_error_messages() {
        let err = RelyingPartyError::DuplicateCallbackArgument {
            key: "state".into(),
        };
        assert_eq!(
            err.to_string(),
            "Callback argument 'state' was already added"
        );

        let err = RelyingPartyError::InvalidUrl {
            field: "return_to",
            reason: "relative URL without a base".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid return_to URL: relative URL without a base"
        );
    }
}
