//! Bus-driving components.

/// Wishbone bus master state machine.
pub mod master;

pub use master::{BusMaster, CycleOutcome};
