//! Host simulation contract and a reference implementation.
//!
//! The bus models need only two things from a simulator: signal get/set and a way to
//! suspend until the next rising edge of a clock. [`ClockHost`] is that contract.
//! [`Testbench`] implements it with a signal table and free-running clocks so the models
//! can run without an RTL simulator.

/// Clock domains and time units.
pub mod clock;

/// Reference host owning signals, clocks, memories and masters.
pub mod testbench;

pub use clock::{ClockDomain, DomainId, TimeUnit};
pub use testbench::{MasterId, MemoryId, Testbench};

use crate::common::BfmError;
use crate::signals::SignalAccess;

/// Host simulation as seen by a bus master waiting on its clock.
pub trait ClockHost {
    /// Signal access for driving and sampling the bus.
    fn bus(&mut self) -> &mut dyn SignalAccess;

    /// Advances simulated time up to and including the next rising edge of `domain`,
    /// letting every other component react to the edges it passes.
    ///
    /// # Errors
    ///
    /// Returns [`BfmError::UnknownClock`] if the host has no such domain.
    fn wait_rising_edge(&mut self, domain: DomainId) -> Result<(), BfmError>;
}
