//! Wishbone bus master.
//!
//! The master executes a batch of requests as one bus cycle: `cyc` stays high for the
//! whole batch and each request gets its own `stb` pulse. Requests are strictly
//! sequential; `stb` drops for at least one edge between two requests. The master is an
//! explicit state machine stepped once per rising edge of its clock, so a host can drive
//! several masters on independent clocks from one event loop. [`BusMaster::run_cycle`]
//! wraps the state machine for callers that simply want to block on one cycle.

use tracing::{debug, warn};

use crate::common::{BfmError, MalformedReason, TransactionRequest, TransactionResult};
use crate::signals::{BusSignals, SignalAccess, width_mask};
use crate::sim::{ClockHost, DomainId};
use crate::stats::BusStats;

/// Outcome of a completed or failed cycle.
pub type CycleOutcome = Result<Vec<TransactionResult>, BfmError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// `stb` low; strobe the current request when `remaining` reaches zero.
    Idle { remaining: u32 },
    /// `stb` high for `waited` edges so far without ack.
    Strobe { waited: u32 },
}

#[derive(Debug)]
struct Cycle {
    requests: Vec<TransactionRequest>,
    results: Vec<TransactionResult>,
    index: usize,
    phase: Phase,
}

/// Bus master bound to one bus interface and one clock domain.
#[derive(Debug)]
pub struct BusMaster {
    name: String,
    signals: BusSignals,
    domain: DomainId,
    timeout_edges: u32,
    cycle: Option<Cycle>,
    stats: BusStats,
}

impl BusMaster {
    /// Creates an idle master.
    ///
    /// `timeout_edges` is the number of rising edges after a strobe within which ack must
    /// be observed; zero is treated as one.
    pub fn new(
        name: impl Into<String>,
        signals: BusSignals,
        domain: DomainId,
        timeout_edges: u32,
    ) -> Self {
        Self {
            name: name.into(),
            signals,
            domain,
            timeout_edges: timeout_edges.max(1),
            cycle: None,
            stats: BusStats::default(),
        }
    }

    /// Master name, used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clock domain the master is stepped on.
    pub const fn domain(&self) -> DomainId {
        self.domain
    }

    /// Resolved bus signal handles.
    pub const fn signals(&self) -> &BusSignals {
        &self.signals
    }

    /// Ack edge budget.
    pub const fn timeout_edges(&self) -> u32 {
        self.timeout_edges
    }

    /// Returns `true` when no cycle is in flight.
    pub const fn is_idle(&self) -> bool {
        self.cycle.is_none()
    }

    /// Activity counters.
    pub const fn stats(&self) -> &BusStats {
        &self.stats
    }

    /// Runs `requests` as one bus cycle, suspending on `host` until it completes.
    ///
    /// Results are returned in submission order, one per request.
    ///
    /// # Errors
    ///
    /// Fails before driving anything with [`BfmError::EmptyCycle`],
    /// [`BfmError::MalformedRequest`] or [`BfmError::MasterBusy`]. Fails with
    /// [`BfmError::ProtocolTimeout`] if a request is not acknowledged in time; results of
    /// earlier requests in the cycle are discarded. Host errors abort the cycle.
    pub fn run_cycle<H: ClockHost + ?Sized>(
        &mut self,
        host: &mut H,
        requests: Vec<TransactionRequest>,
    ) -> CycleOutcome {
        self.begin_cycle(requests, host.bus())?;
        loop {
            if let Err(err) = host.wait_rising_edge(self.domain) {
                self.reset(host.bus());
                return Err(err);
            }
            if let Some(outcome) = self.on_clock_edge(host.bus()) {
                return outcome;
            }
        }
    }

    /// Validates `requests`, asserts `cyc` and drives the first request.
    ///
    /// # Errors
    ///
    /// [`BfmError::MasterBusy`] if a cycle is already in flight, [`BfmError::EmptyCycle`]
    /// for an empty batch and [`BfmError::MalformedRequest`] for the first invalid request,
    /// including an address wider than the host's `adr` signal. No signal is touched
    /// when an error is returned.
    pub fn begin_cycle(
        &mut self,
        requests: Vec<TransactionRequest>,
        bus: &mut dyn SignalAccess,
    ) -> Result<(), BfmError> {
        if self.cycle.is_some() {
            return Err(BfmError::MasterBusy(self.name.clone()));
        }
        if requests.is_empty() {
            return Err(BfmError::EmptyCycle);
        }
        let adr_width = bus.width(self.signals.adr);
        for (index, request) in requests.iter().enumerate() {
            request.validate(index)?;
            // Width zero means the host does not report one.
            if adr_width != 0 && request.address & !width_mask(adr_width) != 0 {
                return Err(BfmError::MalformedRequest {
                    index,
                    reason: MalformedReason::AddressTooWide {
                        address: request.address,
                        width: adr_width,
                    },
                });
            }
        }

        debug!(master = %self.name, requests = requests.len(), "cycle start");
        bus.write(self.signals.cyc, 1);
        let first = requests[0];
        let phase = if first.idle_edges == 0 {
            self.drive_strobe(bus, &first, 0);
            Phase::Strobe { waited: 0 }
        } else {
            bus.write(self.signals.stb, 0);
            Phase::Idle {
                remaining: first.idle_edges,
            }
        };
        self.cycle = Some(Cycle {
            results: Vec::with_capacity(requests.len()),
            requests,
            index: 0,
            phase,
        });
        Ok(())
    }

    /// Steps the master on one rising edge of its clock.
    ///
    /// Returns `None` while the cycle is still running (or when idle), and the cycle's
    /// outcome on the edge it completes or times out.
    pub fn on_clock_edge(&mut self, bus: &mut dyn SignalAccess) -> Option<CycleOutcome> {
        let mut cycle = self.cycle.take()?;
        let request = cycle.requests[cycle.index];

        match cycle.phase {
            Phase::Idle { remaining } if remaining > 1 => {
                cycle.phase = Phase::Idle {
                    remaining: remaining - 1,
                };
            }
            Phase::Idle { .. } => {
                self.drive_strobe(bus, &request, cycle.index);
                cycle.phase = Phase::Strobe { waited: 0 };
            }
            Phase::Strobe { waited } => {
                let waited = waited + 1;
                if bus.read(self.signals.ack) == 0 {
                    if waited >= self.timeout_edges {
                        self.release(bus);
                        self.stats.timeouts += 1;
                        warn!(
                            master = %self.name,
                            index = cycle.index,
                            address = request.address,
                            edges = self.timeout_edges,
                            "ack timeout"
                        );
                        return Some(Err(BfmError::ProtocolTimeout {
                            index: cycle.index,
                            address: request.address,
                            edges: self.timeout_edges,
                        }));
                    }
                    cycle.phase = Phase::Strobe { waited };
                    self.cycle = Some(cycle);
                    return None;
                }

                let data_read = bus.read(self.signals.datrd) as u32;
                debug!(
                    master = %self.name,
                    index = cycle.index,
                    address = request.address,
                    data_read,
                    waited,
                    "ack"
                );
                cycle.results.push(TransactionResult {
                    address: request.address,
                    data_read,
                    data_write: request.data,
                    select: request.byte_select,
                    wait_edges: waited,
                });
                if request.is_write {
                    self.stats.writes += 1;
                } else {
                    self.stats.reads += 1;
                }
                self.stats.wait_edges += u64::from(waited);
                bus.write(self.signals.stb, 0);

                cycle.index += 1;
                if cycle.index == cycle.requests.len() {
                    self.release(bus);
                    self.stats.cycles += 1;
                    debug!(master = %self.name, "cycle end");
                    return Some(Ok(cycle.results));
                }
                cycle.phase = Phase::Idle {
                    remaining: cycle.requests[cycle.index].idle_edges + 1,
                };
            }
        }
        self.cycle = Some(cycle);
        None
    }

    /// Drops any in-flight cycle and deasserts the master's outputs.
    pub fn reset(&mut self, bus: &mut dyn SignalAccess) {
        if self.cycle.is_some() {
            debug!(master = %self.name, "in-flight cycle dropped by reset");
        }
        self.cycle = None;
        self.release(bus);
    }

    fn drive_strobe(&self, bus: &mut dyn SignalAccess, request: &TransactionRequest, index: usize) {
        debug!(
            master = %self.name,
            index,
            address = request.address,
            write = request.is_write,
            "strobe"
        );
        bus.write(self.signals.we, u64::from(request.is_write));
        bus.write(self.signals.adr, request.address);
        bus.write(self.signals.sel, u64::from(request.byte_select));
        if let Some(data) = request.data {
            bus.write(self.signals.datwr, u64::from(data));
        }
        bus.write(self.signals.stb, 1);
    }

    fn release(&self, bus: &mut dyn SignalAccess) {
        bus.write(self.signals.stb, 0);
        bus.write(self.signals.we, 0);
        bus.write(self.signals.cyc, 0);
    }
}
