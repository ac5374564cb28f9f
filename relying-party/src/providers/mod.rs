//! Relying-party providers.
//!
//! This module defines traits for the external collaborators of the relying
//! party. These traits enable dependency injection and make the negotiation
//! logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. The relying party
//! depends on these traits, and the application supplies concrete
//! implementations through [`RelyingPartyEnvironment`](crate::environment::RelyingPartyEnvironment).
//!
//! ```text
//! RelyingParty::create
//!        │
//!        ├──► IdentifierDiscovery      (identifier → endpoints)
//!        │
//!        └──► AssociationManager
//!                 ├──► AssociationRepository   (provider → associations)
//!                 └──► AssociationNegotiator   (provider → new association)
//! ```
//!
//! This enables:
//! - **Testing**: Use mocks (in-memory, deterministic)
//! - **Production**: Use real services (HTTP discovery, Diffie-Hellman exchange, shared stores)

pub mod association_store;
pub mod discovery;
pub mod negotiator;

// Re-export provider traits
pub use association_store::AssociationRepository;
pub use discovery::IdentifierDiscovery;
pub use negotiator::AssociationNegotiator;
