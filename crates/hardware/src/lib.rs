//! Wishbone bus functional model library.
//!
//! This crate models both sides of a 32-bit Wishbone bus at clock-edge granularity:
//! 1. **Bus:** A master that runs batches of read/write transfers as one bus cycle, with
//!    byte selects, per-request idle edges and an ack timeout.
//! 2. **Memory:** A zero-wait-state slave backing a byte-addressable store, with one or
//!    more ports (dual-port RAM) on independent clocks.
//! 3. **Signals:** The signal-access contract the models drive and sample, and typed
//!    role-to-signal bindings validated up front.
//! 4. **Simulation:** A reference host with free-running clock domains, reset sequencing
//!    and concurrent masters.
//! 5. **Configuration:** JSON bench descriptions and activity statistics.

/// Bus master.
pub mod bus;
/// Common types and constants (transactions, errors, bus geometry).
pub mod common;
/// Bench configuration (defaults, clocks, masters, memories, ports).
pub mod config;
/// Memory slave and backing store.
pub mod memory;
/// Signal handles, access contract and role bindings.
pub mod signals;
/// Host contract, clock domains and the reference testbench.
pub mod sim;
/// Master and memory activity counters.
pub mod stats;

/// Bus master; construct with `BusMaster::new` or through `Testbench::from_config`.
pub use crate::bus::BusMaster;
/// Errors surfaced by the models and by configuration loading.
pub use crate::common::{BfmError, ConfigError};
/// Transfer request and result records.
pub use crate::common::{TransactionRequest, TransactionResult};
/// Root bench configuration.
pub use crate::config::BenchConfig;
/// Memory slave.
pub use crate::memory::MemorySlave;
/// Reference host simulation.
pub use crate::sim::Testbench;
