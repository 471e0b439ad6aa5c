//! Bus Master Unit Tests.
//!
//! Verifies cycle framing, strobe spacing, result ordering, ack timeouts and
//! up-front request validation.

use mockall::Sequence;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use wishbone_bfm::common::MalformedReason;
use wishbone_bfm::signals::{BusSignals, SignalAccess, SignalId, SignalMap, SignalTable};
use wishbone_bfm::sim::{ClockHost, DomainId, TimeUnit};
use wishbone_bfm::{BfmError, BusMaster, Testbench, TransactionRequest};

use crate::common::harness::SinglePortBench;
use crate::common::mocks::signals::MockBus;

fn mock_signals() -> BusSignals {
    BusSignals {
        cyc: SignalId(0),
        stb: SignalId(1),
        we: SignalId(2),
        adr: SignalId(3),
        sel: SignalId(4),
        datwr: SignalId(5),
        datrd: SignalId(6),
        ack: SignalId(7),
    }
}

fn silent_bus() -> MockBus {
    let mut bus = MockBus::new();
    let _ = bus.expect_width().return_const(32_u32);
    let _ = bus.expect_write().never();
    let _ = bus.expect_read().never();
    bus
}

/// Host that acknowledges only the first `acks` strobes it sees.
struct StingyHost {
    table: SignalTable,
    signals: BusSignals,
    acks: u32,
    edges: u32,
}

impl StingyHost {
    fn new(acks: u32) -> Self {
        let mut table = SignalTable::new();
        let signals = SignalMap::with_affixes("wb_", "").declare(&mut table, 32).unwrap();
        Self {
            table,
            signals,
            acks,
            edges: 0,
        }
    }
}

impl ClockHost for StingyHost {
    fn bus(&mut self) -> &mut dyn SignalAccess {
        &mut self.table
    }

    fn wait_rising_edge(&mut self, domain: DomainId) -> Result<(), BfmError> {
        if domain != DomainId(0) {
            return Err(BfmError::UnknownClock(domain.0.to_string()));
        }
        self.edges += 1;
        let s = self.signals;
        let strobed = self.table.read(s.cyc) == 1 && self.table.read(s.stb) == 1;
        let ack = strobed && self.acks > 0;
        if ack {
            self.acks -= 1;
        }
        self.table.write(s.ack, u64::from(ack));
        self.table.write(s.datrd, 0x5a5a_5a5a);
        Ok(())
    }
}

/// Host whose slave acknowledges a strobe on its `latency`-th edge.
struct WaitStateHost {
    table: SignalTable,
    signals: BusSignals,
    latency: u32,
    strobed_edges: u32,
}

impl WaitStateHost {
    fn new(latency: u32) -> Self {
        let mut table = SignalTable::new();
        let signals = SignalMap::with_affixes("wb_", "").declare(&mut table, 32).unwrap();
        Self {
            table,
            signals,
            latency,
            strobed_edges: 0,
        }
    }
}

impl ClockHost for WaitStateHost {
    fn bus(&mut self) -> &mut dyn SignalAccess {
        &mut self.table
    }

    fn wait_rising_edge(&mut self, _domain: DomainId) -> Result<(), BfmError> {
        let s = self.signals;
        let strobed = self.table.read(s.cyc) == 1 && self.table.read(s.stb) == 1;
        self.strobed_edges = if strobed { self.strobed_edges + 1 } else { 0 };
        let ack = strobed && self.strobed_edges == self.latency;
        if ack {
            self.strobed_edges = 0;
        }
        self.table.write(s.ack, u64::from(ack));
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════
// 1. Cycle results
// ══════════════════════════════════════════════════════════

#[test]
fn master_zero_wait_slave_acks_after_one_edge() {
    let mut bench = SinglePortBench::new();
    let results = bench.cycle(vec![TransactionRequest::read(0)]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].wait_edges, 1);
    assert_eq!(bench.tb.clock(bench.clk).unwrap().edges(), 1);
}

#[test]
fn master_preserves_request_order() {
    let mut bench = SinglePortBench::new();
    let results = bench.cycle(vec![
        TransactionRequest::write(5, 0xaaaa_aaaa),
        TransactionRequest::read(5),
        TransactionRequest::write(5, 0xbbbb_bbbb),
        TransactionRequest::read(5),
        TransactionRequest::read(6),
    ]);
    let seen: Vec<(u64, u32, Option<u32>)> = results
        .iter()
        .map(|r| (r.address, r.data_read, r.data_write))
        .collect();
    assert_eq!(
        seen,
        vec![
            (5, 0, Some(0xaaaa_aaaa)),
            (5, 0xaaaa_aaaa, None),
            (5, 0xaaaa_aaaa, Some(0xbbbb_bbbb)),
            (5, 0xbbbb_bbbb, None),
            (6, 0, None),
        ]
    );
}

#[test]
fn master_result_echoes_select() {
    let mut bench = SinglePortBench::new();
    let results = bench.cycle(vec![TransactionRequest::write_masked(1, 0xffff_ffff, 0b0011)]);
    assert_eq!(results[0].select, 0b0011);
    assert_eq!(bench.read(1), 0x0000_ffff);
}

#[test]
fn master_releases_bus_after_cycle() {
    let mut bench = SinglePortBench::new();
    bench.write(0, 1);
    let s = bench.signals;
    let table = bench.tb.signals();
    assert_eq!(table.read(s.cyc), 0);
    assert_eq!(table.read(s.stb), 0);
    assert_eq!(table.read(s.we), 0);
    assert!(bench.tb.master(bench.master).unwrap().is_idle());
}

// ══════════════════════════════════════════════════════════
// 2. Strobe spacing and idle edges
// ══════════════════════════════════════════════════════════

#[test]
fn master_drops_strobe_between_requests() {
    let mut bench = SinglePortBench::new();
    let _ = bench.cycle(vec![TransactionRequest::read(0), TransactionRequest::read(1)]);
    // ack, one edge with stb low, strobe, ack
    assert_eq!(bench.tb.clock(bench.clk).unwrap().edges(), 3);
}

#[test]
fn master_idle_edges_delay_strobe() {
    let mut bench = SinglePortBench::new();
    let results = bench.cycle(vec![TransactionRequest::read(0).with_idle(3)]);
    assert_eq!(results[0].wait_edges, 1);
    assert_eq!(bench.tb.clock(bench.clk).unwrap().edges(), 4);
}

#[test]
fn master_idle_edges_add_to_gap() {
    let mut bench = SinglePortBench::new();
    let _ = bench.cycle(vec![
        TransactionRequest::read(0),
        TransactionRequest::read(1).with_idle(2),
    ]);
    assert_eq!(bench.tb.clock(bench.clk).unwrap().edges(), 5);
}

// ══════════════════════════════════════════════════════════
// 3. Timeouts
// ══════════════════════════════════════════════════════════

#[test]
fn master_times_out_without_slave() {
    let mut tb = Testbench::new();
    let clk = tb.add_clock("clk", 1, TimeUnit::Ns);
    let signals = SignalMap::with_affixes("wb_", "")
        .declare(tb.signals_mut(), 32)
        .unwrap();
    let id = tb.add_master(BusMaster::new("wbm", signals, clk, 5)).unwrap();

    let err = tb
        .run_cycle(id, vec![TransactionRequest::read(0x20)])
        .unwrap_err();
    assert_eq!(
        err,
        BfmError::ProtocolTimeout {
            index: 0,
            address: 0x20,
            edges: 5
        }
    );
    assert_eq!(tb.clock(clk).unwrap().edges(), 5);
    assert_eq!(tb.signals().read(signals.cyc), 0);
    assert_eq!(tb.signals().read(signals.stb), 0);

    let master = tb.master(id).unwrap();
    assert!(master.is_idle());
    assert_eq!(master.stats().timeouts, 1);
    assert_eq!(master.stats().cycles, 0);
}

#[test]
fn master_timeout_reports_failing_request() {
    let mut host = StingyHost::new(1);
    let mut master = BusMaster::new("wbm", host.signals, DomainId(0), 3);
    let err = master
        .run_cycle(
            &mut host,
            vec![TransactionRequest::read(1), TransactionRequest::read(2)],
        )
        .unwrap_err();
    assert_eq!(
        err,
        BfmError::ProtocolTimeout {
            index: 1,
            address: 2,
            edges: 3
        }
    );
    // ack, gap edge, three unacknowledged edges
    assert_eq!(host.edges, 5);
    assert_eq!(master.stats().reads, 1);
}

#[test]
fn master_ack_on_last_budget_edge_succeeds() {
    let mut host = WaitStateHost::new(3);
    let mut master = BusMaster::new("wbm", host.signals, DomainId(0), 3);
    let results = master
        .run_cycle(
            &mut host,
            vec![TransactionRequest::read(1), TransactionRequest::write(2, 9)],
        )
        .unwrap();
    assert_eq!(results[0].wait_edges, 3);
    assert_eq!(results[1].wait_edges, 3);
    assert_eq!(master.stats().timeouts, 0);
}

#[test]
fn master_ack_one_edge_past_budget_times_out() {
    let mut host = WaitStateHost::new(4);
    let mut master = BusMaster::new("wbm", host.signals, DomainId(0), 3);
    let err = master
        .run_cycle(&mut host, vec![TransactionRequest::read(1)])
        .unwrap_err();
    assert_eq!(
        err,
        BfmError::ProtocolTimeout {
            index: 0,
            address: 1,
            edges: 3
        }
    );
    assert_eq!(host.table.read(host.signals.stb), 0);
}

#[test]
fn master_zero_timeout_is_one_edge() {
    let master = BusMaster::new("wbm", mock_signals(), DomainId(0), 0);
    assert_eq!(master.timeout_edges(), 1);
}

#[test]
fn master_host_error_aborts_cycle() {
    let mut host = StingyHost::new(1);
    let mut master = BusMaster::new("wbm", host.signals, DomainId(9), 3);
    let err = master
        .run_cycle(&mut host, vec![TransactionRequest::read(0)])
        .unwrap_err();
    assert_eq!(err, BfmError::UnknownClock("9".into()));
    assert!(master.is_idle());
    assert_eq!(host.table.read(host.signals.cyc), 0);
}

// ══════════════════════════════════════════════════════════
// 4. Request validation
// ══════════════════════════════════════════════════════════

#[test]
fn master_rejects_empty_cycle_without_driving() {
    let mut bus = silent_bus();
    let mut master = BusMaster::new("wbm", mock_signals(), DomainId(0), 10);
    assert_eq!(master.begin_cycle(Vec::new(), &mut bus), Err(BfmError::EmptyCycle));
    assert!(master.is_idle());
}

#[test]
fn master_rejects_invalid_select_without_driving() {
    let mut bus = silent_bus();
    let mut master = BusMaster::new("wbm", mock_signals(), DomainId(0), 10);
    let err = master
        .begin_cycle(
            vec![
                TransactionRequest::read(0),
                TransactionRequest::write_masked(1, 0, 0b1_0000),
            ],
            &mut bus,
        )
        .unwrap_err();
    assert_eq!(
        err,
        BfmError::MalformedRequest {
            index: 1,
            reason: MalformedReason::InvalidSelect(0b1_0000)
        }
    );
}

#[test]
fn master_rejects_write_without_data() {
    let mut bus = silent_bus();
    let mut master = BusMaster::new("wbm", mock_signals(), DomainId(0), 10);
    let request = TransactionRequest {
        data: None,
        ..TransactionRequest::write(0, 0)
    };
    let err = master.begin_cycle(vec![request], &mut bus).unwrap_err();
    assert_eq!(
        err,
        BfmError::MalformedRequest {
            index: 0,
            reason: MalformedReason::MissingWriteData
        }
    );
}

#[test]
fn master_rejects_read_with_data() {
    let mut bus = silent_bus();
    let mut master = BusMaster::new("wbm", mock_signals(), DomainId(0), 10);
    let request = TransactionRequest {
        data: Some(7),
        ..TransactionRequest::read(0)
    };
    let err = master.begin_cycle(vec![request], &mut bus).unwrap_err();
    assert_eq!(
        err,
        BfmError::MalformedRequest {
            index: 0,
            reason: MalformedReason::UnexpectedReadData
        }
    );
}

#[test]
fn master_rejects_address_wider_than_adr_signal() {
    let mut table = SignalTable::new();
    let signals = SignalMap::with_affixes("wb_", "").declare(&mut table, 6).unwrap();
    let mut master = BusMaster::new("wbm", signals, DomainId(0), 10);
    let err = master
        .begin_cycle(
            vec![TransactionRequest::read(0x3f), TransactionRequest::write(0x41, 0xabcd)],
            &mut table,
        )
        .unwrap_err();
    assert_eq!(
        err,
        BfmError::MalformedRequest {
            index: 1,
            reason: MalformedReason::AddressTooWide {
                address: 0x41,
                width: 6
            }
        }
    );
    assert!(master.is_idle());
    assert_eq!(table.read(signals.cyc), 0);
    assert_eq!(table.read(signals.adr), 0);
}

#[test]
fn master_address_filling_adr_signal_is_accepted() {
    let mut tb = Testbench::new();
    let clk = tb.add_clock("clk", 1, TimeUnit::Ns);
    let signals = SignalMap::with_affixes("wb_", "")
        .declare(tb.signals_mut(), 6)
        .unwrap();
    let memory = tb.add_memory(wishbone_bfm::MemorySlave::single_port("ram", 256, signals));
    tb.bind_port(memory, wishbone_bfm::memory::PortId(0), clk).unwrap();
    let id = tb.add_master(BusMaster::new("wbm", signals, clk, 10)).unwrap();

    let results = tb
        .run_cycle(
            id,
            vec![TransactionRequest::write(0x3f, 0xabcd), TransactionRequest::read(0x3f)],
        )
        .unwrap();
    assert_eq!(results[1].address, 0x3f);
    assert_eq!(results[1].data_read, 0xabcd);
    assert_eq!(
        tb.run_cycle(id, vec![TransactionRequest::read(0x40)]),
        Err(BfmError::MalformedRequest {
            index: 0,
            reason: MalformedReason::AddressTooWide {
                address: 0x40,
                width: 6
            }
        })
    );
}

#[test]
fn master_busy_rejects_second_cycle() {
    let mut table = SignalTable::new();
    let signals = SignalMap::with_affixes("wb_", "").declare(&mut table, 32).unwrap();
    let mut master = BusMaster::new("wbm", signals, DomainId(0), 10);
    master
        .begin_cycle(vec![TransactionRequest::read(0)], &mut table)
        .unwrap();
    assert!(!master.is_idle());
    assert_eq!(
        master.begin_cycle(vec![TransactionRequest::read(1)], &mut table),
        Err(BfmError::MasterBusy("wbm".into()))
    );
    assert_eq!(table.read(signals.adr), 0);

    master.reset(&mut table);
    assert!(master.is_idle());
    assert_eq!(table.read(signals.cyc), 0);
}

// ══════════════════════════════════════════════════════════
// 5. Signal driving
// ══════════════════════════════════════════════════════════

#[test]
fn master_write_strobe_drives_signals_in_order() {
    let s = mock_signals();
    let mut bus = MockBus::new();
    let _ = bus.expect_width().return_const(32_u32);
    let mut seq = Sequence::new();
    for (id, value) in [
        (s.cyc, 1),
        (s.we, 1),
        (s.adr, 0x12),
        (s.sel, 0b0101),
        (s.datwr, 0xdead_beef),
        (s.stb, 1),
    ] {
        let _ = bus
            .expect_write()
            .with(eq(id), eq(value))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
    }
    let mut master = BusMaster::new("wbm", s, DomainId(0), 10);
    master
        .begin_cycle(
            vec![TransactionRequest::write_masked(0x12, 0xdead_beef, 0b0101)],
            &mut bus,
        )
        .unwrap();
}

#[test]
fn master_read_strobe_leaves_datwr_alone() {
    let s = mock_signals();
    let mut bus = MockBus::new();
    let _ = bus.expect_width().return_const(32_u32);
    let _ = bus
        .expect_write()
        .withf(move |id, _| *id != s.datwr)
        .times(5)
        .return_const(());
    let mut master = BusMaster::new("wbm", s, DomainId(0), 10);
    master
        .begin_cycle(vec![TransactionRequest::read(3)], &mut bus)
        .unwrap();
}
