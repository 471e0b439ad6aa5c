//! Mock implementations of host-side contracts.

/// Mocked signal access.
pub mod signals;
