//! # OpenID Relying Party
//!
//! This crate provides the relying-party core of OpenID authentication:
//! association caching, endpoint selection, and lazy negotiation of
//! authentication requests.
//!
//! ## Features
//!
//! - **Association reuse**: Shared secrets are cached per provider and reused
//!   while they have enough lifetime left
//! - **Graceful degradation**: Providers that refuse an association are tried
//!   last, in dumb mode, unless security settings forbid it
//! - **Lazy**: Nothing is negotiated until the caller asks for the next
//!   request
//! - **Testable**: Discovery, negotiation, storage and time are injected
//!
//! ## Architecture
//!
//! ```text
//! identifier → discovery → filter/sort → RequestNegotiator ─► AuthenticationRequest ─► RequestMessage
//!                                              │
//!                                              ▼
//!                                     AssociationManager ─► AssociationRepository
//!                                              │
//!                                              ▼
//!                                     AssociationNegotiator
//! ```
//!
//! ## Example
//!
//! ```
//! use openid_relying_party::mocks::{MockAssociationNegotiator, MockDiscovery};
//! use openid_relying_party::stores::InMemoryAssociationRepository;
//! use openid_relying_party::environment::{RelyingPartyEnvironment, SystemClock};
//! use openid_relying_party::{ProtocolVersion, ProviderEndpoint, RelyingParty, RelyingPartyConfig};
//! use std::sync::Arc;
//! use url::Url;
//!
//! # fn main() -> openid_relying_party::Result<()> {
//! let endpoint = ProviderEndpoint::new(
//!     Url::parse("https://op.example/server").unwrap(),
//!     ProtocolVersion::V2_0,
//! )
//! .with_claimed_identifier("https://alice.example/");
//!
//! let env = RelyingPartyEnvironment::new(
//!     Arc::new(MockDiscovery::new().with("alice.example", vec![endpoint])),
//!     Arc::new(MockAssociationNegotiator::new(Arc::new(SystemClock))),
//!     Arc::new(InMemoryAssociationRepository::new()),
//! );
//! let rp = RelyingParty::new(RelyingPartyConfig::default(), env)?;
//!
//! let mut requests = rp.create(
//!     "alice.example",
//!     "https://rp.example/",
//!     "https://rp.example/return",
//!     true,
//! )?;
//!
//! let mut request = requests.next().unwrap();
//! request.add_callback_argument("state", "xyz")?;
//! let message = request.build()?;
//!
//! assert!(!message.is_dumb_mode());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod association;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod filter;
pub mod manager;
pub mod message;
pub mod negotiator;
pub mod providers;
pub mod realm;
pub mod relying_party;
pub mod request;
pub mod stores;

// Test utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use association::{Association, AssociationHandle};
pub use config::{RelyingPartyConfig, SecuritySettings};
pub use endpoint::{Identifier, ProtocolVersion, ProviderDescription, ProviderEndpoint};
pub use error::{RelyingPartyError, Result};
pub use message::{AuthenticationMode, Extension, RequestMessage};
pub use negotiator::RequestNegotiator;
pub use realm::Realm;
pub use relying_party::RelyingParty;
pub use request::{AssociationPreference, AuthenticationRequest};
