//! Scripted cycles for the `run` subcommand.
//!
//! A script lists bus cycles to run against a bench, optionally preceded by a reset and
//! optionally grouped to run concurrently on independent masters:
//!
//! ```json
//! {
//!   "reset": { "clock": "clk_a", "signal": "wb_a_rst_i" },
//!   "steps": [
//!     { "master": "wbm_a", "ops": [
//!         { "op": "write", "address": "0x11", "data": "0xdeadbeef" },
//!         { "op": "read", "address": "0x11", "expect": "0xdeadbeef" } ] },
//!     { "parallel": [ { "master": "wbm_a", "ops": [] }, { "master": "wbm_b", "ops": [] } ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use wishbone_bfm::bus::CycleOutcome;
use wishbone_bfm::common::constants::SEL_ALL;
use wishbone_bfm::sim::MasterId;
use wishbone_bfm::{BfmError, Testbench, TransactionRequest, TransactionResult};

/// Whole script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Reset sequence applied before the first step.
    #[serde(default)]
    pub reset: Option<ResetStep>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Reset sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetStep {
    /// Clock domain counted while holding and settling.
    pub clock: String,
    /// Reset signal name.
    pub signal: String,
    /// Edges the reset is held high.
    #[serde(default = "default_reset_edges")]
    pub hold: u32,
    /// Edges waited after release.
    #[serde(default = "default_reset_edges")]
    pub settle: u32,
}

const fn default_reset_edges() -> u32 {
    10
}

/// One step: a single cycle, or cycles on different masters run concurrently.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Cycles started together and run until all finish.
    Parallel {
        /// The concurrent cycles.
        parallel: Vec<CycleScript>,
    },
    /// A single cycle.
    Single(CycleScript),
}

/// One bus cycle on a named master.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleScript {
    /// Master name.
    pub master: String,
    /// Transfers of the cycle.
    pub ops: Vec<OpScript>,
}

/// Transfer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Read transfer.
    Read,
    /// Write transfer.
    Write,
}

/// One transfer with an optional expected read value.
#[derive(Debug, Clone, Deserialize)]
pub struct OpScript {
    /// Transfer kind.
    pub op: OpKind,
    /// Word address.
    #[serde(deserialize_with = "number")]
    pub address: u64,
    /// Write data; values wider than 32 bits are rejected when the script is parsed.
    #[serde(default, deserialize_with = "optional_word")]
    pub data: Option<u32>,
    /// Byte select, all lanes when absent.
    #[serde(default, deserialize_with = "optional_number")]
    pub sel: Option<u64>,
    /// Idle edges before the strobe.
    #[serde(default)]
    pub idle: u32,
    /// Value `datrd` must carry on the ack edge.
    #[serde(default, deserialize_with = "optional_number")]
    pub expect: Option<u64>,
}

impl OpScript {
    /// Full-word read with no expectation.
    pub const fn read(address: u64) -> Self {
        Self {
            op: OpKind::Read,
            address,
            data: None,
            sel: None,
            idle: 0,
            expect: None,
        }
    }

    /// Full-word write.
    pub const fn write(address: u64, data: u32) -> Self {
        Self {
            op: OpKind::Write,
            data: Some(data),
            ..Self::read(address)
        }
    }

    /// Returns the op with `datrd` expected to carry `value` on its ack edge.
    #[must_use]
    pub const fn expecting(mut self, value: u32) -> Self {
        self.expect = Some(value as u64);
        self
    }

    /// Builds the bus request. A select wider than eight bits is saturated so the
    /// master's own validation reports it.
    pub fn request(&self) -> TransactionRequest {
        let byte_select = self.sel.map_or(SEL_ALL, |sel| u8::try_from(sel).unwrap_or(u8::MAX));
        TransactionRequest {
            address: self.address,
            data: self.data,
            byte_select,
            is_write: self.op == OpKind::Write,
            idle_edges: self.idle,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

fn parse_number(raw: Number) -> Result<u64, String> {
    match raw {
        Number::Int(value) => Ok(value),
        Number::Text(text) => {
            let text = text.trim();
            let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
                None => text.replace('_', "").parse(),
            };
            parsed.map_err(|e| format!("invalid number `{text}`: {e}"))
        }
    }
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    parse_number(Number::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

fn optional_word<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    optional_number(deserializer)?
        .map(|value| {
            u32::try_from(value).map_err(|_| {
                serde::de::Error::custom(format!("data {value:#x} does not fit 32 bits"))
            })
        })
        .transpose()
}

fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<Number>::deserialize(deserializer)?
        .map(parse_number)
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Report of one executed cycle.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    /// Master name.
    pub master: String,
    /// Transfer results, empty when the cycle failed.
    pub results: Vec<TransactionResult>,
    /// Failure message, if the cycle failed.
    pub error: Option<String>,
    /// Expected-value mismatches.
    pub mismatches: Vec<Mismatch>,
}

/// An `expect` that did not hold.
#[derive(Debug, Serialize)]
pub struct Mismatch {
    /// Position of the transfer in its cycle.
    pub index: usize,
    /// Word address of the transfer.
    pub address: u64,
    /// Expected value.
    pub expected: u64,
    /// Value read.
    pub actual: u32,
}

impl CycleReport {
    /// Returns `true` when the cycle completed and every expectation held.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.mismatches.is_empty()
    }
}

/// Runs every step of `script` on `bench`.
///
/// # Errors
///
/// Fails only if the reset names an unknown clock; per-cycle failures, unknown masters
/// included, are reported in the returned reports instead.
pub fn execute(bench: &mut Testbench, script: &Script) -> Result<Vec<CycleReport>, BfmError> {
    if let Some(reset) = &script.reset {
        let domain = bench.domain(&reset.clock)?;
        bench.reset(domain, &reset.signal, reset.hold, reset.settle)?;
    }

    let mut reports = Vec::new();
    for step in &script.steps {
        let cycles = match step {
            Step::Parallel { parallel } => parallel.as_slice(),
            Step::Single(cycle) => std::slice::from_ref(cycle),
        };
        // Cycles naming an unknown master fail on their own; the rest still run.
        let mut early: Vec<Option<CycleOutcome>> = Vec::with_capacity(cycles.len());
        let mut batches: Vec<(MasterId, Vec<TransactionRequest>)> =
            Vec::with_capacity(cycles.len());
        for cycle in cycles {
            match bench.master_id(&cycle.master) {
                Some(id) => {
                    batches.push((id, cycle.ops.iter().map(OpScript::request).collect()));
                    early.push(None);
                }
                None => early.push(Some(Err(BfmError::UnknownMaster(cycle.master.clone())))),
            }
        }
        let mut ran = if batches.len() == 1 {
            let (id, requests) = batches.remove(0);
            vec![bench.run_cycle(id, requests)]
        } else {
            bench.run_concurrent(batches)
        }
        .into_iter();
        for (cycle, slot) in cycles.iter().zip(early) {
            let Some(outcome) = slot.or_else(|| ran.next()) else {
                break;
            };
            reports.push(report(cycle, outcome));
        }
    }
    Ok(reports)
}

fn report(cycle: &CycleScript, outcome: CycleOutcome) -> CycleReport {
    match outcome {
        Ok(results) => {
            let mismatches = cycle
                .ops
                .iter()
                .zip(&results)
                .enumerate()
                .filter_map(|(index, (op, result))| {
                    let expected = op.expect?;
                    (expected != u64::from(result.data_read)).then_some(Mismatch {
                        index,
                        address: result.address,
                        expected,
                        actual: result.data_read,
                    })
                })
                .collect();
            CycleReport {
                master: cycle.master.clone(),
                results,
                error: None,
                mismatches,
            }
        }
        Err(err) => CycleReport {
            master: cycle.master.clone(),
            results: Vec::new(),
            error: Some(err.to_string()),
            mismatches: Vec::new(),
        },
    }
}
