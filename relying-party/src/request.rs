//! Authentication requests.
//!
//! An [`AuthenticationRequest`] is produced per usable provider endpoint by
//! the [`RequestNegotiator`](crate::RequestNegotiator). The caller may adjust
//! it (mode, extensions, callback arguments, association preference) and then
//! calls [`AuthenticationRequest::build`] to obtain the outbound message.
//!
//! # Association preference
//!
//! ```text
//!  IfPossible ──(creation fails)──► IfAlreadyEstablished
//!      │                                   │
//!      ▼                                   ▼
//!  get_or_create                      get_existing          Never ─► no association
//! ```
//!
//! The association is resolved at build time. Once a creation attempt has
//! failed the preference downgrades itself, so building the same request
//! twice never negotiates twice.

use crate::association::Association;
use crate::constants::RESERVED_ARG_PREFIX;
use crate::endpoint::ProviderEndpoint;
use crate::error::{RelyingPartyError, Result};
use crate::manager::AssociationManager;
use crate::message::{AuthenticationMode, Extension, RequestMessage, RequestMessageBuilder};
use crate::realm::Realm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// How hard a request tries to obtain an association when built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssociationPreference {
    /// Reuse an association or create one.
    #[default]
    IfPossible,

    /// Reuse an association but never create one.
    IfAlreadyEstablished,

    /// Always use dumb mode.
    Never,
}

impl AssociationPreference {
    /// Preference after an association creation attempt failed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use openid_relying_party::AssociationPreference;
    /// assert_eq!(
    ///     AssociationPreference::IfPossible.after_creation_failure(),
    ///     AssociationPreference::IfAlreadyEstablished,
    /// );
    /// assert_eq!(
    ///     AssociationPreference::Never.after_creation_failure(),
    ///     AssociationPreference::Never,
    /// );
    /// ```
    #[must_use]
    pub const fn after_creation_failure(self) -> Self {
        match self {
            Self::IfPossible => Self::IfAlreadyEstablished,
            other => other,
        }
    }
}

/// State shared by every request produced by one negotiation.
#[derive(Debug)]
pub(crate) struct RequestContext {
    pub(crate) realm: Realm,
    pub(crate) return_to: Url,
    pub(crate) manager: AssociationManager,
    pub(crate) require_association: bool,
}

/// Authentication request for one provider endpoint.
///
/// Not meant to be shared between threads while being mutated; every
/// mutator takes `&mut self`.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    endpoint: ProviderEndpoint,
    context: Arc<RequestContext>,
    mode: AuthenticationMode,
    association_preference: AssociationPreference,
    extensions: Vec<Arc<dyn Extension>>,
    callback_arguments: BTreeMap<String, String>,
    extension_only: bool,
}

impl AuthenticationRequest {
    pub(crate) fn new(endpoint: ProviderEndpoint, context: Arc<RequestContext>) -> Self {
        Self {
            endpoint,
            context,
            mode: AuthenticationMode::default(),
            association_preference: AssociationPreference::default(),
            extensions: Vec::new(),
            callback_arguments: BTreeMap::new(),
            extension_only: false,
        }
    }

    pub(crate) fn with_association_preference(mut self, preference: AssociationPreference) -> Self {
        self.association_preference = preference;
        self
    }

    // ═══════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════

    /// Claimed identifier, or `None` when the provider picks the identity.
    #[must_use]
    pub fn claimed_identifier(&self) -> Option<&str> {
        if self.endpoint.is_directed_identity() {
            None
        } else {
            self.endpoint.claimed_identifier.as_deref()
        }
    }

    /// Whether the provider picks the identity.
    #[must_use]
    pub fn is_directed_identity(&self) -> bool {
        self.endpoint.is_directed_identity()
    }

    /// Discovered endpoint this request targets.
    #[must_use]
    pub const fn endpoint(&self) -> &ProviderEndpoint {
        &self.endpoint
    }

    /// Provider endpoint URI.
    #[must_use]
    pub const fn provider(&self) -> &Url {
        &self.endpoint.provider_uri
    }

    /// Realm shown to the user.
    #[must_use]
    pub fn realm(&self) -> &Realm {
        &self.context.realm
    }

    /// Return-to base URL (without callback arguments).
    #[must_use]
    pub fn return_to(&self) -> &Url {
        &self.context.return_to
    }

    /// Interaction mode.
    #[must_use]
    pub const fn mode(&self) -> AuthenticationMode {
        self.mode
    }

    /// Current association preference.
    #[must_use]
    pub const fn association_preference(&self) -> AssociationPreference {
        self.association_preference
    }

    /// Whether the request asks for no identity assertion.
    #[must_use]
    pub const fn is_extension_only(&self) -> bool {
        self.extension_only
    }

    /// Extensions in insertion order.
    #[must_use]
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// Callback arguments added so far.
    #[must_use]
    pub const fn callback_arguments(&self) -> &BTreeMap<String, String> {
        &self.callback_arguments
    }

    // ═══════════════════════════════════════════════════════════
    // Mutators
    // ═══════════════════════════════════════════════════════════

    /// Set the interaction mode.
    pub fn set_mode(&mut self, mode: AuthenticationMode) {
        self.mode = mode;
    }

    /// Set the association preference.
    pub fn set_association_preference(&mut self, preference: AssociationPreference) {
        self.association_preference = preference;
    }

    /// Ask for extensions only, without an identity assertion.
    pub fn set_extension_only(&mut self, extension_only: bool) {
        self.extension_only = extension_only;
    }

    /// Attach an extension. Extensions are sent in insertion order.
    pub fn add_extension(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Add an argument to be echoed back on the return-to URL.
    ///
    /// # Errors
    ///
    /// - [`RelyingPartyError::CallbackArgumentsUnsupported`] without an
    ///   association store
    /// - [`RelyingPartyError::EmptyCallbackArgumentKey`] for an empty key
    /// - [`RelyingPartyError::ReservedCallbackArgument`] for keys starting
    ///   with `openid.`
    /// - [`RelyingPartyError::DuplicateCallbackArgument`] if the key was
    ///   already added
    pub fn add_callback_argument(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let key = key.into();
        self.check_callback_key(&key)?;
        self.callback_arguments.insert(key, value.into());
        Ok(())
    }

    /// Add several callback arguments. Either all are added or none.
    ///
    /// # Errors
    ///
    /// Same as [`AuthenticationRequest::add_callback_argument`]; a key
    /// repeated within `arguments` is a duplicate.
    pub fn add_callback_arguments<I, K, V>(&mut self, arguments: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut staged = BTreeMap::new();
        for (key, value) in arguments {
            let key = key.into();
            self.check_callback_key(&key)?;
            if staged.contains_key(&key) {
                return Err(RelyingPartyError::DuplicateCallbackArgument { key });
            }
            staged.insert(key, value.into());
        }
        self.callback_arguments.extend(staged);
        Ok(())
    }

    fn check_callback_key(&self, key: &str) -> Result<()> {
        if !self.context.manager.has_association_store() {
            return Err(RelyingPartyError::CallbackArgumentsUnsupported);
        }
        if key.is_empty() {
            return Err(RelyingPartyError::EmptyCallbackArgumentKey);
        }
        if key.starts_with(RESERVED_ARG_PREFIX) {
            return Err(RelyingPartyError::ReservedCallbackArgument {
                key: key.to_string(),
            });
        }
        if self.callback_arguments.contains_key(key) {
            return Err(RelyingPartyError::DuplicateCallbackArgument {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════
    // Build
    // ═══════════════════════════════════════════════════════════

    /// Build the outbound message from the current state.
    ///
    /// Safe to call repeatedly: a failed association creation is not
    /// retried on later builds.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::AssociationRequired`] if security
    /// settings require an association and none could be resolved.
    pub fn build(&mut self) -> Result<RequestMessage> {
        let association = self.resolve_association();

        if association.is_none() && self.context.require_association {
            return Err(RelyingPartyError::AssociationRequired {
                provider: self.endpoint.provider_uri.to_string(),
            });
        }

        let context = &self.context;
        let message = RequestMessageBuilder::new(&self.endpoint, &context.realm, &context.return_to)
            .mode(self.mode)
            .association(association.as_ref())
            .extension_only(self.extension_only)
            .callback_arguments(&self.callback_arguments)
            .extensions(&self.extensions)
            .build();
        Ok(message)
    }

    fn resolve_association(&mut self) -> Option<Association> {
        let provider = &self.endpoint.provider_description;
        let manager = &self.context.manager;

        match self.association_preference {
            AssociationPreference::IfPossible => {
                let association = manager.get_or_create_association(provider);
                if association.is_none() {
                    self.association_preference =
                        self.association_preference.after_creation_failure();
                    tracing::debug!(
                        provider = %provider.uri,
                        "Association unavailable, request falls back to dumb mode"
                    );
                }
                association
            }
            AssociationPreference::IfAlreadyEstablished => {
                manager.get_existing_association(provider)
            }
            AssociationPreference::Never => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::endpoint::ProtocolVersion;
    use crate::mocks::{MockAssociationNegotiator, test_clock};
    use crate::providers::AssociationRepository;
    use crate::stores::InMemoryAssociationRepository;
    use chrono::Duration;

    struct Fixture {
        negotiator: MockAssociationNegotiator,
        endpoint: ProviderEndpoint,
    }

    fn fixture() -> Fixture {
        Fixture {
            negotiator: MockAssociationNegotiator::new(Arc::new(test_clock())),
            endpoint: ProviderEndpoint::new(
                Url::parse("https://op.example/server").unwrap(),
                ProtocolVersion::V2_0,
            )
            .with_claimed_identifier("https://alice.example/"),
        }
    }

    fn request(f: &Fixture, with_store: bool, require_association: bool) -> AuthenticationRequest {
        let clock = test_clock();
        let repository = InMemoryAssociationRepository::with_clock(Arc::new(clock.clone()));
        let repository: Option<Arc<dyn AssociationRepository>> =
            with_store.then(|| Arc::new(repository) as _);
        let manager = AssociationManager::new(
            repository,
            Arc::new(f.negotiator.clone()),
            Arc::new(clock),
            Duration::zero(),
        );
        let context = Arc::new(RequestContext {
            realm: Realm::parse("https://rp.example/").unwrap(),
            return_to: Url::parse("https://rp.example/return").unwrap(),
            manager,
            require_association,
        });
        AuthenticationRequest::new(f.endpoint.clone(), context)
    }

    #[test]
    fn test_failed_creation_downgrades_preference_once() {
        let f = fixture();
        f.negotiator.fail_for(&f.endpoint.provider_uri);
        let mut req = request(&f, true, false);

        let first = req.build().unwrap();
        assert!(first.is_dumb_mode());
        assert_eq!(
            req.association_preference(),
            AssociationPreference::IfAlreadyEstablished
        );

        let second = req.build().unwrap();
        assert!(second.is_dumb_mode());
        assert_eq!(f.negotiator.calls_for(&f.endpoint.provider_uri), 1);
    }

    #[test]
    fn test_successful_build_is_idempotent() {
        let f = fixture();
        let mut req = request(&f, true, false);

        let first = req.build().unwrap();
        let second = req.build().unwrap();

        assert!(first.association_handle.is_some());
        assert_eq!(first.association_handle, second.association_handle);
        assert_eq!(
            req.association_preference(),
            AssociationPreference::IfPossible
        );
        assert_eq!(f.negotiator.total_calls(), 1);
    }

    #[test]
    fn test_never_preference_skips_association() {
        let f = fixture();
        let mut req = request(&f, true, false);
        req.set_association_preference(AssociationPreference::Never);

        assert!(req.build().unwrap().is_dumb_mode());
        assert_eq!(f.negotiator.total_calls(), 0);
    }

    #[test]
    fn test_required_association_fails_build() {
        let f = fixture();
        let mut req = request(&f, true, true);
        req.set_association_preference(AssociationPreference::Never);

        let err = req.build().unwrap_err();
        assert!(err.is_security_issue());
    }

    #[test]
    fn test_callback_argument_integrity() {
        let f = fixture();
        let mut req = request(&f, true, false);

        req.add_callback_argument("state", "1").unwrap();
        assert_eq!(
            req.add_callback_argument("state", "2").unwrap_err(),
            RelyingPartyError::DuplicateCallbackArgument {
                key: "state".into(),
            }
        );
        assert_eq!(
            req.add_callback_argument("", "x").unwrap_err(),
            RelyingPartyError::EmptyCallbackArgumentKey
        );
        assert!(matches!(
            req.add_callback_argument("openid.mode", "x").unwrap_err(),
            RelyingPartyError::ReservedCallbackArgument { .. }
        ));
        assert_eq!(req.callback_arguments()["state"], "1");
    }

    #[test]
    fn test_callback_arguments_require_store() {
        let f = fixture();
        let mut req = request(&f, false, false);

        assert_eq!(
            req.add_callback_argument("state", "1").unwrap_err(),
            RelyingPartyError::CallbackArgumentsUnsupported
        );
        assert!(req.build().unwrap().is_dumb_mode());
    }

    #[test]
    fn test_bulk_callback_arguments_are_atomic() {
        let f = fixture();
        let mut req = request(&f, true, false);

        let duplicated = [("a", "1"), ("b", "2"), ("a", "3")];
        let err = req.add_callback_arguments(duplicated).unwrap_err();
        assert!(matches!(err, RelyingPartyError::DuplicateCallbackArgument { .. }));
        assert!(req.callback_arguments().is_empty());

        let distinct = [("a", "1"), ("b", "2")];
        req.add_callback_arguments(distinct).unwrap();
        assert_eq!(req.callback_arguments().len(), 2);
    }

    #[test]
    fn test_claimed_identifier_hidden_for_directed_identity() {
        let mut f = fixture();
        let req = request(&f, true, false);
        assert_eq!(req.claimed_identifier(), Some("https://alice.example/"));

        f.endpoint = f.endpoint.as_op_identifier();
        let req = request(&f, true, false);
        assert!(req.is_directed_identity());
        assert_eq!(req.claimed_identifier(), None);
    }
}
