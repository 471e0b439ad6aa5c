//! Reference host simulation.
//!
//! The testbench owns every piece of a bench and advances simulated time edge by edge:
//! 1. **Signals:** A [`SignalTable`] shared by all components.
//! 2. **Clocks:** Independent free-running domains; the earliest pending rising edge
//!    fires next, simultaneous edges fire in domain registration order.
//! 3. **Memories:** Slave ports bound to a domain respond first on each of its edges,
//!    in binding order.
//! 4. **Masters:** Attached masters of the domain step after the memories, so a
//!    zero-wait slave's ack is visible on the same edge.

use tracing::info;

use super::ClockHost;
use super::clock::{ClockDomain, DomainId, TimeUnit};
use crate::bus::{BusMaster, CycleOutcome};
use crate::common::constants::CONTROL_BITS;
use crate::common::{BfmError, ConfigError, TransactionRequest};
use crate::config::BenchConfig;
use crate::memory::{MemorySlave, PortId};
use crate::signals::{SignalAccess, SignalTable};

/// Index of a master attached to a [`Testbench`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MasterId(pub usize);

/// Index of a memory registered on a [`Testbench`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryId(pub usize);

#[derive(Clone, Copy, Debug)]
struct PortBinding {
    memory: MemoryId,
    port: PortId,
    domain: DomainId,
}

/// Event-driven host for bus masters and memory slaves.
#[derive(Debug, Default)]
pub struct Testbench {
    signals: SignalTable,
    domains: Vec<ClockDomain>,
    memories: Vec<MemorySlave>,
    bindings: Vec<PortBinding>,
    /// `None` while the master is lent out to [`Testbench::run_cycle`].
    masters: Vec<Option<BusMaster>>,
    outcomes: Vec<Option<CycleOutcome>>,
    now_fs: u64,
}

impl Testbench {
    /// Creates an empty bench at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bench from configuration: declares every mapped signal, creates clocks,
    /// memories with their ports, and masters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if validation fails and [`ConfigError::Bfm`] if a
    /// signal map cannot be resolved.
    pub fn from_config(config: &BenchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut bench = Self::new();
        for clock in &config.clocks {
            let _ = bench.add_clock(&clock.name, clock.period, clock.unit);
        }
        for memory in &config.memories {
            let mut slave = MemorySlave::new(&memory.name, memory.size_bytes);
            let mut ports = Vec::with_capacity(memory.ports.len());
            for port in &memory.ports {
                let signals = port.signals.declare(&mut bench.signals, port.adr_width)?;
                let domain = bench.domain(&port.clock)?;
                ports.push((slave.add_port(signals, port.base_offset), domain));
            }
            let id = bench.add_memory(slave);
            for (port, domain) in ports {
                bench.bind_port(id, port, domain)?;
            }
        }
        for master in &config.masters {
            let signals = master.signals.declare(&mut bench.signals, master.adr_width)?;
            let domain = bench.domain(&master.clock)?;
            let _ = bench.add_master(BusMaster::new(
                &master.name,
                signals,
                domain,
                master.timeout_edges,
            ))?;
        }
        Ok(bench)
    }

    /// Shared signal table.
    pub const fn signals(&self) -> &SignalTable {
        &self.signals
    }

    /// Mutable signal table, for declaring nets and poking values from a test.
    pub const fn signals_mut(&mut self) -> &mut SignalTable {
        &mut self.signals
    }

    /// Current simulated time in femtoseconds.
    pub const fn now_fs(&self) -> u64 {
        self.now_fs
    }

    /// Registers a clock domain.
    pub fn add_clock(&mut self, name: &str, period: u64, unit: TimeUnit) -> DomainId {
        self.domains.push(ClockDomain::new(name, period, unit));
        DomainId(self.domains.len() - 1)
    }

    /// Looks up a clock domain by name.
    ///
    /// # Errors
    ///
    /// [`BfmError::UnknownClock`] if no domain has that name.
    pub fn domain(&self, name: &str) -> Result<DomainId, BfmError> {
        self.domains
            .iter()
            .position(|d| d.name() == name)
            .map(DomainId)
            .ok_or_else(|| BfmError::UnknownClock(name.to_owned()))
    }

    /// Returns a registered clock domain.
    pub fn clock(&self, id: DomainId) -> Option<&ClockDomain> {
        self.domains.get(id.0)
    }

    /// Registers a memory; bind its ports with [`Testbench::bind_port`].
    pub fn add_memory(&mut self, memory: MemorySlave) -> MemoryId {
        self.memories.push(memory);
        MemoryId(self.memories.len() - 1)
    }

    /// Makes `port` of `memory` respond on every rising edge of `domain`.
    ///
    /// # Errors
    ///
    /// [`BfmError::UnknownMemory`] or [`BfmError::UnknownClock`] for ids the bench does
    /// not know, including a port the memory never registered.
    pub fn bind_port(
        &mut self,
        memory: MemoryId,
        port: PortId,
        domain: DomainId,
    ) -> Result<(), BfmError> {
        let slave = self
            .memories
            .get(memory.0)
            .ok_or_else(|| BfmError::UnknownMemory(memory.0.to_string()))?;
        if slave.port(port).is_none() {
            return Err(BfmError::UnknownMemory(format!("{}.port{}", slave.name(), port.0)));
        }
        self.check_domain(domain)?;
        self.bindings.push(PortBinding {
            memory,
            port,
            domain,
        });
        Ok(())
    }

    /// Returns a registered memory.
    pub fn memory(&self, id: MemoryId) -> Option<&MemorySlave> {
        self.memories.get(id.0)
    }

    /// Returns a registered memory mutably.
    pub fn memory_mut(&mut self, id: MemoryId) -> Option<&mut MemorySlave> {
        self.memories.get_mut(id.0)
    }

    /// Looks up a memory by name.
    pub fn memory_id(&self, name: &str) -> Option<MemoryId> {
        self.memories
            .iter()
            .position(|m| m.name() == name)
            .map(MemoryId)
    }

    /// Attaches a master; it is stepped on every rising edge of its domain.
    ///
    /// # Errors
    ///
    /// [`BfmError::UnknownClock`] if the master's domain is not registered.
    pub fn add_master(&mut self, master: BusMaster) -> Result<MasterId, BfmError> {
        self.check_domain(master.domain())?;
        self.masters.push(Some(master));
        self.outcomes.push(None);
        Ok(MasterId(self.masters.len() - 1))
    }

    /// Returns an attached master.
    pub fn master(&self, id: MasterId) -> Option<&BusMaster> {
        self.masters.get(id.0).and_then(Option::as_ref)
    }

    /// Looks up a master by name.
    pub fn master_id(&self, name: &str) -> Option<MasterId> {
        self.masters
            .iter()
            .position(|m| m.as_ref().is_some_and(|m| m.name() == name))
            .map(MasterId)
    }

    /// Advances to the earliest pending rising edge and fires every domain due then.
    ///
    /// Returns the domains that fired, empty if the bench has no clock.
    pub fn step(&mut self) -> Vec<DomainId> {
        let Some(now) = self.domains.iter().map(ClockDomain::next_edge_fs).min() else {
            return Vec::new();
        };
        self.now_fs = now;
        let due: Vec<DomainId> = self
            .domains
            .iter()
            .enumerate()
            .filter(|(_, d)| d.next_edge_fs() == now)
            .map(|(i, _)| DomainId(i))
            .collect();
        for &domain in &due {
            self.fire_edge(domain);
            self.domains[domain.0].advance();
        }
        due
    }

    /// Waits `edges` rising edges of `domain`.
    ///
    /// # Errors
    ///
    /// [`BfmError::UnknownClock`] if the domain is not registered.
    pub fn wait_edges(&mut self, domain: DomainId, edges: u32) -> Result<(), BfmError> {
        for _ in 0..edges {
            self.wait_rising_edge(domain)?;
        }
        Ok(())
    }

    /// Holds `signal` high for `hold_edges` rising edges of `domain`, releases it, then
    /// waits `settle_edges` more edges. Attached masters on the domain are reset first.
    ///
    /// The signal is declared as a one-bit net if the bench does not know it yet.
    ///
    /// # Errors
    ///
    /// [`BfmError::UnknownClock`] if the domain is not registered.
    pub fn reset(
        &mut self,
        domain: DomainId,
        signal: &str,
        hold_edges: u32,
        settle_edges: u32,
    ) -> Result<(), BfmError> {
        self.check_domain(domain)?;
        for master in self.masters.iter_mut().flatten() {
            if master.domain() == domain {
                master.reset(&mut self.signals);
            }
        }
        let rst = self.signals.declare(signal, CONTROL_BITS);
        info!(signal, hold_edges, settle_edges, "reset asserted");
        self.signals.write(rst, 1);
        self.wait_edges(domain, hold_edges)?;
        self.signals.write(rst, 0);
        info!(signal, "reset released");
        self.wait_edges(domain, settle_edges)
    }

    /// Runs one cycle on an attached master, blocking until it completes.
    ///
    /// Other attached masters and all bound memories keep reacting to their edges while
    /// the cycle runs.
    ///
    /// # Errors
    ///
    /// [`BfmError::UnknownMaster`] for an unknown id, otherwise whatever
    /// [`BusMaster::run_cycle`] reports.
    pub fn run_cycle(
        &mut self,
        master: MasterId,
        requests: Vec<TransactionRequest>,
    ) -> CycleOutcome {
        let mut lent = self
            .masters
            .get_mut(master.0)
            .and_then(Option::take)
            .ok_or_else(|| BfmError::UnknownMaster(master.0.to_string()))?;
        let outcome = lent.run_cycle(self, requests);
        self.masters[master.0] = Some(lent);
        outcome
    }

    /// Starts one cycle per batch on independent masters and runs until all finish.
    ///
    /// Outcomes are returned in batch order. A batch whose cycle cannot start (busy,
    /// malformed, unknown master) fails on its own without affecting the others.
    pub fn run_concurrent(
        &mut self,
        batches: Vec<(MasterId, Vec<TransactionRequest>)>,
    ) -> Vec<CycleOutcome> {
        let mut outcomes: Vec<Option<CycleOutcome>> = Vec::with_capacity(batches.len());
        let mut pending = Vec::new();
        for (slot, (id, requests)) in batches.into_iter().enumerate() {
            let started = match self.masters.get_mut(id.0).and_then(Option::as_mut) {
                Some(master) => master.begin_cycle(requests, &mut self.signals),
                None => Err(BfmError::UnknownMaster(id.0.to_string())),
            };
            match started {
                Ok(()) => {
                    self.outcomes[id.0] = None;
                    outcomes.push(None);
                    pending.push((slot, id));
                }
                Err(err) => outcomes.push(Some(Err(err))),
            }
        }

        while !pending.is_empty() {
            if self.step().is_empty() {
                for &(slot, id) in &pending {
                    outcomes[slot] = Some(Err(BfmError::UnknownClock(id.0.to_string())));
                }
                break;
            }
            pending.retain(|&(slot, id)| match self.outcomes[id.0].take() {
                Some(outcome) => {
                    outcomes[slot] = Some(outcome);
                    false
                }
                None => true,
            });
        }

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or(Err(BfmError::EmptyCycle)))
            .collect()
    }

    fn check_domain(&self, domain: DomainId) -> Result<(), BfmError> {
        if domain.0 < self.domains.len() {
            Ok(())
        } else {
            Err(BfmError::UnknownClock(domain.0.to_string()))
        }
    }

    fn fire_edge(&mut self, domain: DomainId) {
        for binding in &self.bindings {
            if binding.domain == domain {
                let memory = &mut self.memories[binding.memory.0];
                let _ = memory.on_clock_edge(binding.port, &mut self.signals);
            }
        }
        for (slot, master) in self.masters.iter_mut().enumerate() {
            let Some(master) = master else { continue };
            if master.domain() != domain {
                continue;
            }
            if let Some(outcome) = master.on_clock_edge(&mut self.signals) {
                self.outcomes[slot] = Some(outcome);
            }
        }
    }
}

impl ClockHost for Testbench {
    fn bus(&mut self) -> &mut dyn SignalAccess {
        &mut self.signals
    }

    fn wait_rising_edge(&mut self, domain: DomainId) -> Result<(), BfmError> {
        self.check_domain(domain)?;
        while !self.step().contains(&domain) {}
        Ok(())
    }
}
