//! Wishbone memory slave.
//!
//! This module implements the passive side of the bus. It provides:
//! 1. **Store:** [`BackingStore`], the byte array the slave exclusively owns.
//! 2. **Ports:** One or more bus interfaces onto the same store, each with its own byte
//!    window offset, so a dual-port RAM is one slave with two ports.
//! 3. **Edge response:** [`MemorySlave::on_clock_edge`], invoked once per rising edge of
//!    the port's clock, decoding `adr`/`sel`/`datwr` into byte stores and driving
//!    `datrd`/`ack`.
//!
//! The slave keeps no state across edges besides the store contents, so ports on
//! independent clocks can share it: each edge is applied atomically and the host's edge
//! ordering serializes them. Arbitration between ports is the host's business.

/// Byte-addressable backing store.
pub mod store;

use tracing::{trace, warn};

use self::store::BackingStore;
use crate::common::constants::{SEL_ALL, WORD_SHIFT};
use crate::signals::{BusSignals, SignalAccess};
use crate::stats::MemoryStats;

/// Index of a port registered on a [`MemorySlave`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortId(pub usize);

/// One bus interface onto the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlavePort {
    /// Resolved handles of the port's bus signals.
    pub signals: BusSignals,
    /// Byte address at which this port's window starts; subtracted after decoding `adr`.
    pub base_offset: u64,
}

impl SlavePort {
    /// Maps a word address on this port to a store byte address, or `None` if it falls
    /// below the window or overflows.
    pub fn decode(&self, adr: u64) -> Option<u64> {
        adr.checked_mul(1 << WORD_SHIFT)?.checked_sub(self.base_offset)
    }
}

/// Zero-wait-state memory slave backing a byte array.
#[derive(Debug)]
pub struct MemorySlave {
    name: String,
    store: BackingStore,
    ports: Vec<SlavePort>,
    stats: MemoryStats,
}

impl MemorySlave {
    /// Creates a slave with a zeroed store of `size` bytes and no ports.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            store: BackingStore::new(size),
            ports: Vec::new(),
            stats: MemoryStats::default(),
        }
    }

    /// Creates a slave with one port at byte offset zero; the port is `PortId(0)`.
    pub fn single_port(name: impl Into<String>, size: usize, signals: BusSignals) -> Self {
        let mut slave = Self::new(name, size);
        let _ = slave.add_port(signals, 0);
        slave
    }

    /// Registers a bus interface whose window starts at byte `base_offset`.
    pub fn add_port(&mut self, signals: BusSignals, base_offset: u64) -> PortId {
        self.ports.push(SlavePort {
            signals,
            base_offset,
        });
        PortId(self.ports.len() - 1)
    }

    /// Returns the slave's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a registered port.
    pub fn port(&self, id: PortId) -> Option<&SlavePort> {
        self.ports.get(id.0)
    }

    /// Number of registered ports.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Read-only view of the store.
    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    /// Mutable view of the store, for preloading and inspecting contents from a test.
    pub fn store_mut(&mut self) -> &mut BackingStore {
        &mut self.store
    }

    /// Activity counters.
    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    /// Word currently addressed by `adr` on `port`.
    ///
    /// Pure function of the address and the store contents; this is what the slave
    /// drives on `datrd` every edge. Bytes outside the store read as zero.
    pub fn read_word(&self, port: PortId, adr: u64) -> u32 {
        self.port(port)
            .and_then(|p| p.decode(adr))
            .map_or(0, |addr| self.store.read_word_le(addr))
    }

    /// Responds to one rising edge of `port`'s clock.
    ///
    /// Always drives `datrd` with the addressed word. When `cyc` and `stb` are both high
    /// the transfer is acknowledged on this edge, and if `we` is high the lanes enabled in
    /// `sel` are stored after `datrd` was computed. Returns `true` if ack was asserted.
    pub fn on_clock_edge(&mut self, port: PortId, bus: &mut dyn SignalAccess) -> bool {
        let Some(&slave_port) = self.ports.get(port.0) else {
            warn!(memory = %self.name, port = port.0, "edge for unregistered port ignored");
            return false;
        };
        let signals = slave_port.signals;
        self.stats.edges += 1;

        let adr = bus.read(signals.adr);
        let byte_addr = slave_port.decode(adr);
        let data = byte_addr.map_or(0, |addr| self.store.read_word_le(addr));
        bus.write(signals.datrd, u64::from(data));

        let strobed = bus.read(signals.cyc) != 0 && bus.read(signals.stb) != 0;
        bus.write(signals.ack, u64::from(strobed));
        if !strobed {
            return false;
        }
        self.stats.acks += 1;

        let in_range = byte_addr.is_some_and(|addr| self.store.contains_word(addr));
        if bus.read(signals.we) == 0 {
            trace!(memory = %self.name, port = port.0, adr, data, "read");
            if !in_range {
                self.stats.clamped_reads += 1;
                warn!(memory = %self.name, port = port.0, adr, "read outside store, zero-filled");
            }
            return true;
        }

        let sel = (bus.read(signals.sel) as u8) & SEL_ALL;
        let value = bus.read(signals.datwr) as u32;
        let lanes = match byte_addr {
            Some(addr) => self.store.write_lanes(addr, value, sel),
            None => store::LaneWrite {
                written: 0,
                dropped: sel.count_ones(),
            },
        };
        self.stats.lanes_written += u64::from(lanes.written);
        self.stats.dropped_lanes += u64::from(lanes.dropped);
        trace!(memory = %self.name, port = port.0, adr, value, sel, "write");
        if lanes.dropped > 0 {
            warn!(
                memory = %self.name,
                port = port.0,
                adr,
                dropped = lanes.dropped,
                "write lanes outside store dropped"
            );
        }
        true
    }
}
