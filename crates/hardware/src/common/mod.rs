//! Common types and constants shared across the bus functional model.
//!
//! This module provides the building blocks used by both sides of the bus. It includes:
//! 1. **Constants:** Data, select and address geometry of the 32-bit Wishbone bus.
//! 2. **Transactions:** Request and result records exchanged with the bus master.
//! 3. **Error Handling:** Protocol, wiring and configuration error types.

/// Bus geometry constants.
pub mod constants;

/// Error types for protocol, wiring and configuration failures.
pub mod error;

/// Transaction request/result records and lane helpers.
pub mod transaction;

pub use error::{BfmError, ConfigError, MalformedReason};
pub use transaction::{TransactionRequest, TransactionResult, expand_select};
