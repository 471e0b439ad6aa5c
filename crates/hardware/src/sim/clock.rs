//! Clock domains of the reference host.
//!
//! Each domain is an independent free-running clock. Rising edges are scheduled on an
//! integer femtosecond timeline, the first one at time zero.

use serde::{Deserialize, Serialize};

/// Unit of a clock period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Femtoseconds.
    Fs,
    /// Picoseconds.
    Ps,
    /// Nanoseconds.
    Ns,
    /// Microseconds.
    #[default]
    Us,
    /// Milliseconds.
    Ms,
    /// Seconds.
    S,
}

impl TimeUnit {
    /// Length of one unit in femtoseconds.
    pub const fn femtos(self) -> u64 {
        match self {
            Self::Fs => 1,
            Self::Ps => 1_000,
            Self::Ns => 1_000_000,
            Self::Us => 1_000_000_000,
            Self::Ms => 1_000_000_000_000,
            Self::S => 1_000_000_000_000_000,
        }
    }
}

/// Index of a clock domain registered on a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DomainId(pub usize);

/// Free-running clock.
#[derive(Clone, Debug)]
pub struct ClockDomain {
    name: String,
    period_fs: u64,
    next_edge_fs: u64,
    edges: u64,
}

impl ClockDomain {
    /// Creates a clock of `period` `unit`s. A zero period is treated as one femtosecond.
    pub fn new(name: impl Into<String>, period: u64, unit: TimeUnit) -> Self {
        Self {
            name: name.into(),
            period_fs: period.saturating_mul(unit.femtos()).max(1),
            next_edge_fs: 0,
            edges: 0,
        }
    }

    /// Domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Period in femtoseconds.
    pub const fn period_fs(&self) -> u64 {
        self.period_fs
    }

    /// Time of the next rising edge in femtoseconds.
    pub const fn next_edge_fs(&self) -> u64 {
        self.next_edge_fs
    }

    /// Rising edges fired so far.
    pub const fn edges(&self) -> u64 {
        self.edges
    }

    /// Marks the pending edge as fired and schedules the next one.
    pub(crate) const fn advance(&mut self) {
        self.edges += 1;
        self.next_edge_fs = self.next_edge_fs.saturating_add(self.period_fs);
    }
}
