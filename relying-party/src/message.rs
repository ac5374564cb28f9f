//! Outbound authentication request messages.
//!
//! [`RequestMessageBuilder`] turns the state of an authentication request
//! (endpoint, realm, return-to, association, callback arguments, extensions)
//! into a [`RequestMessage`]. Encoding the message for a redirect or form
//! post is the transport's job.

use crate::association::{Association, AssociationHandle};
use crate::constants::{IDENTIFIER_SELECT, USER_SUPPLIED_IDENTIFIER_ARG, modes};
use crate::endpoint::{ProtocolVersion, ProviderEndpoint};
use crate::realm::Realm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Protocol extension attached to a request (attribute exchange, PAPE, ...).
///
/// The payload schema belongs to the extension; the request only carries it.
pub trait Extension: fmt::Debug + Send + Sync {
    /// Namespace URI identifying the extension.
    fn type_uri(&self) -> &str;
}

/// Whether the provider may interact with the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthenticationMode {
    /// The provider may show UI (`checkid_setup`).
    #[default]
    Setup,

    /// The provider must answer without UI (`checkid_immediate`).
    Immediate,
}

impl AuthenticationMode {
    /// Protocol name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => modes::CHECKID_SETUP,
            Self::Immediate => modes::CHECKID_IMMEDIATE,
        }
    }
}

/// Shape of the outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Identity assertion request.
    CheckId {
        /// Claimed identifier. Absent for 1.x providers.
        claimed_id: Option<String>,

        /// Identifier the provider authenticates.
        local_id: String,
    },

    /// Carrier for extensions only; asks for no identity assertion.
    ExtensionOnly,
}

/// Fully assembled authentication request.
#[derive(Debug, Clone)]
pub struct RequestMessage {
    /// Provider endpoint the message is sent to.
    pub provider_endpoint: Url,

    /// Protocol version spoken with the provider.
    pub protocol_version: ProtocolVersion,

    /// Interaction mode.
    pub mode: AuthenticationMode,

    /// Message shape.
    pub kind: RequestKind,

    /// Realm shown to the user.
    pub realm: Realm,

    /// Return-to URL including callback arguments.
    pub return_to: Url,

    /// Association handle, or `None` for dumb mode.
    pub association_handle: Option<AssociationHandle>,

    /// Extensions in the order they were added.
    pub extensions: Vec<Arc<dyn Extension>>,
}

impl RequestMessage {
    /// Whether no association was used (the provider's response must be
    /// checked directly with the provider).
    #[must_use]
    pub const fn is_dumb_mode(&self) -> bool {
        self.association_handle.is_none()
    }

    /// Extension with the given namespace URI, if attached.
    #[must_use]
    pub fn extension(&self, type_uri: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.iter().find(|e| e.type_uri() == type_uri)
    }
}

/// Assembles a [`RequestMessage`] from request state.
#[derive(Debug)]
pub struct RequestMessageBuilder<'a> {
    endpoint: &'a ProviderEndpoint,
    realm: &'a Realm,
    return_to: &'a Url,
    mode: AuthenticationMode,
    association: Option<&'a Association>,
    extension_only: bool,
    callback_arguments: Option<&'a BTreeMap<String, String>>,
    extensions: &'a [Arc<dyn Extension>],
}

impl<'a> RequestMessageBuilder<'a> {
    /// Start a builder for `endpoint`.
    #[must_use]
    pub const fn new(endpoint: &'a ProviderEndpoint, realm: &'a Realm, return_to: &'a Url) -> Self {
        Self {
            endpoint,
            realm,
            return_to,
            mode: AuthenticationMode::Setup,
            association: None,
            extension_only: false,
            callback_arguments: None,
            extensions: &[],
        }
    }

    /// Set the interaction mode.
    #[must_use]
    pub const fn mode(mut self, mode: AuthenticationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sign with `association` (`None` for dumb mode).
    #[must_use]
    pub const fn association(mut self, association: Option<&'a Association>) -> Self {
        self.association = association;
        self
    }

    /// Build an extension-only message.
    #[must_use]
    pub const fn extension_only(mut self, extension_only: bool) -> Self {
        self.extension_only = extension_only;
        self
    }

    /// Arguments appended to the return-to URL.
    #[must_use]
    pub const fn callback_arguments(mut self, arguments: &'a BTreeMap<String, String>) -> Self {
        self.callback_arguments = Some(arguments);
        self
    }

    /// Extensions to attach, in order.
    #[must_use]
    pub const fn extensions(mut self, extensions: &'a [Arc<dyn Extension>]) -> Self {
        self.extensions = extensions;
        self
    }

    /// Assemble the message.
    #[must_use]
    pub fn build(self) -> RequestMessage {
        RequestMessage {
            provider_endpoint: self.endpoint.provider_uri.clone(),
            protocol_version: self.endpoint.protocol_version,
            mode: self.mode,
            kind: self.kind(),
            realm: self.realm.clone(),
            return_to: self.return_to_with_arguments(),
            association_handle: self.association.map(|a| a.handle().clone()),
            extensions: self.extensions.to_vec(),
        }
    }

    fn kind(&self) -> RequestKind {
        if self.extension_only {
            return RequestKind::ExtensionOnly;
        }

        let endpoint = self.endpoint;
        let supports_claimed_id = endpoint.protocol_version.supports_claimed_id();
        if endpoint.is_directed_identity() {
            return RequestKind::CheckId {
                claimed_id: supports_claimed_id.then(|| IDENTIFIER_SELECT.to_string()),
                local_id: IDENTIFIER_SELECT.to_string(),
            };
        }

        RequestKind::CheckId {
            claimed_id: endpoint
                .claimed_identifier
                .clone()
                .filter(|_| supports_claimed_id),
            local_id: endpoint
                .provider_local_identifier()
                .unwrap_or(IDENTIFIER_SELECT)
                .to_string(),
        }
    }

    fn return_to_with_arguments(&self) -> Url {
        let mut arguments: Vec<(&str, &str)> = self
            .callback_arguments
            .into_iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        if let Some(user_supplied) = self.endpoint.user_supplied_identifier.as_deref() {
            if self.endpoint.claimed_identifier.as_deref() != Some(user_supplied) {
                arguments.push((USER_SUPPLIED_IDENTIFIER_ARG, user_supplied));
            }
        }

        let mut return_to = self.return_to.clone();
        if !arguments.is_empty() {
            return_to.query_pairs_mut().extend_pairs(arguments);
        }
        return_to
    }
}
