//! Association storage implementations.
//!
//! - **Association Store** - handle-keyed table of one provider's associations
//! - **In-Memory Repository** - provider-keyed [`AssociationRepository`](crate::providers::AssociationRepository)
//!   built from association stores

pub mod association_store;
pub mod memory;

// Re-exports
pub use association_store::AssociationStore;
pub use memory::InMemoryAssociationRepository;
