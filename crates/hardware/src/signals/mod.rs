//! Signal-level access to the simulated design.
//!
//! The bus models never see hardware state directly; they read and write named signals
//! through the [`SignalAccess`] contract supplied by the host simulation. This module
//! provides:
//! 1. **Handles:** [`SignalId`], an opaque index resolved once from a signal name.
//! 2. **Contract:** [`SignalAccess`], the get/set primitives a host must expose.
//! 3. **Reference table:** [`SignalTable`], a name-indexed signal store used by the
//!    in-crate testbench and by tests.

/// Signal roles, role-to-name maps and resolved bus handles.
pub mod roles;

use std::collections::HashMap;

pub use roles::{BusSignals, SignalMap, SignalRole};

/// Opaque handle to one physical signal of the host simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub usize);

/// Get/set primitives over the host simulation's signals.
///
/// Values are carried as `u64`; hosts mask writes to the declared width of the signal.
pub trait SignalAccess {
    /// Resolves a physical signal name to a handle.
    fn lookup(&self, name: &str) -> Option<SignalId>;
    /// Returns the current value of a signal.
    fn read(&self, id: SignalId) -> u64;
    /// Drives a new value onto a signal.
    fn write(&mut self, id: SignalId, value: u64);
    /// Returns the declared width of a signal in bits.
    fn width(&self, id: SignalId) -> u32;
}

/// Returns the value mask for a signal of `width` bits.
pub const fn width_mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Name-indexed signal store.
///
/// Signals are zero when declared. Reads of unknown handles return zero and writes to
/// them are ignored, matching an undriven net.
#[derive(Clone, Debug, Default)]
pub struct SignalTable {
    names: Vec<String>,
    widths: Vec<u32>,
    values: Vec<u64>,
    index: HashMap<String, SignalId>,
}

impl SignalTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a signal of `width` bits, returning its handle.
    ///
    /// Declaring an existing name returns the existing handle and keeps the wider of the
    /// two widths, so a master and a slave may both declare a shared net.
    pub fn declare(&mut self, name: &str, width: u32) -> SignalId {
        let width = width.clamp(1, u64::BITS);
        if let Some(&id) = self.index.get(name) {
            let slot = &mut self.widths[id.0];
            *slot = (*slot).max(width);
            return id;
        }
        let id = SignalId(self.names.len());
        self.names.push(name.to_owned());
        self.widths.push(width);
        self.values.push(0);
        let _ = self.index.insert(name.to_owned(), id);
        id
    }

    /// Returns the name a handle was declared with.
    pub fn name(&self, id: SignalId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    /// Returns the current value of a signal by name.
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.lookup(name).map(|id| self.read(id))
    }

    /// Number of declared signals.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no signal has been declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SignalAccess for SignalTable {
    fn lookup(&self, name: &str) -> Option<SignalId> {
        self.index.get(name).copied()
    }

    fn read(&self, id: SignalId) -> u64 {
        self.values.get(id.0).copied().unwrap_or(0)
    }

    fn write(&mut self, id: SignalId, value: u64) {
        if let (Some(slot), Some(&width)) = (self.values.get_mut(id.0), self.widths.get(id.0)) {
            *slot = value & width_mask(width);
        }
    }

    fn width(&self, id: SignalId) -> u32 {
        self.widths.get(id.0).copied().unwrap_or(0)
    }
}
