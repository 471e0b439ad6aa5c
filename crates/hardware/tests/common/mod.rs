//! Shared test infrastructure.


/// Mock implementations of host-side contracts.
pub mod mocks;
