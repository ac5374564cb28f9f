//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of the provider
//! traits for use in unit and integration tests.

pub mod clock;
pub mod discovery;
pub mod negotiator;

pub use clock::{FixedClock, test_clock};
pub use discovery::MockDiscovery;
pub use negotiator::MockAssociationNegotiator;
