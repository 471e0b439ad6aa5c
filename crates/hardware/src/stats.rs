//! Bus activity counters.
//!
//! This module tracks what the bus models did during a run. It provides:
//! 1. **Master counters:** Completed cycles, reads, writes, timeouts and ack latency.
//! 2. **Memory counters:** Edges serviced, lanes written and soft out-of-range events.

use std::fmt;

use serde::Serialize;

/// Counters kept by one bus master.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Cycles that completed with every request acknowledged.
    pub cycles: u64,
    /// Read transfers acknowledged.
    pub reads: u64,
    /// Write transfers acknowledged.
    pub writes: u64,
    /// Cycles abandoned because ack never arrived.
    pub timeouts: u64,
    /// Sum of strobe-to-ack edges over all acknowledged transfers.
    pub wait_edges: u64,
}

impl BusStats {
    /// Mean strobe-to-ack latency in edges, or zero before any transfer.
    pub fn mean_wait(&self) -> f64 {
        let transfers = self.reads + self.writes;
        if transfers == 0 {
            0.0
        } else {
            self.wait_edges as f64 / transfers as f64
        }
    }
}

impl fmt::Display for BusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} reads={} writes={} timeouts={} mean_wait={:.2}",
            self.cycles,
            self.reads,
            self.writes,
            self.timeouts,
            self.mean_wait()
        )
    }
}

/// Counters kept by one memory slave, summed over its ports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Clock edges serviced.
    pub edges: u64,
    /// Strobed transfers acknowledged.
    pub acks: u64,
    /// Byte lanes stored.
    pub lanes_written: u64,
    /// Strobed reads that touched bytes outside the store.
    pub clamped_reads: u64,
    /// Enabled write lanes dropped because they fell outside the store.
    pub dropped_lanes: u64,
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edges={} acks={} lanes_written={} clamped_reads={} dropped_lanes={}",
            self.edges, self.acks, self.lanes_written, self.clamped_reads, self.dropped_lanes
        )
    }
}
