//! Wishbone bus functional model CLI.
//!
//! This binary runs benches described in JSON. It performs:
//! 1. **Run:** Build a bench from a configuration file, execute a script of bus cycles
//!    against it and print the results as JSON; failed expectations set the exit code.
//! 2. **Demo:** Run the built-in dual-port RAM scenario (two masters on independent
//!    clocks sharing one store through offset windows).
//!
//! Logs go to stderr (`RUST_LOG` or `-v`), results to stdout.

mod script;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wishbone_bfm::config::{BenchConfig, ClockConfig, MasterConfig, MemoryConfig, PortConfig};
use wishbone_bfm::signals::SignalMap;
use wishbone_bfm::Testbench;

use crate::script::{CycleReport, CycleScript, OpScript, ResetStep, Script, Step};

#[derive(Parser, Debug)]
#[command(
    name = "wbfm",
    author,
    version,
    about = "Wishbone bus functional model runner",
    long_about = concat!(
        "Build a Wishbone bench (clocks, bus masters, memory slaves) from JSON ",
        "and run scripted bus cycles against it.\n\n",
        "Examples:\n  wbfm run bench.json --script cycles.json\n  wbfm demo -v"
    )
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a script of bus cycles against a bench configuration.
    Run {
        /// Bench configuration (clocks, masters, memories).
        config: PathBuf,

        /// Script of cycles to run; without one the bench is only built and validated.
        #[arg(short, long)]
        script: Option<PathBuf>,
    },

    /// Run the built-in dual-port RAM scenario.
    Demo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Run { config, script } => cmd_run(&config, script.as_deref()),
        Commands::Demo => cmd_demo(),
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            error!("{message}");
            eprintln!("Error: {message}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(config_path: &Path, script_path: Option<&Path>) -> Result<bool, String> {
    let config = BenchConfig::from_file(config_path)
        .map_err(|e| format!("{}: {e}", config_path.display()))?;
    let mut bench = Testbench::from_config(&config).map_err(|e| e.to_string())?;
    info!(
        clocks = config.clocks.len(),
        masters = config.masters.len(),
        memories = config.memories.len(),
        signals = bench.signals().len(),
        "bench built"
    );

    let Some(script_path) = script_path else {
        return Ok(true);
    };
    let text = fs::read_to_string(script_path)
        .map_err(|e| format!("{}: {e}", script_path.display()))?;
    let script: Script =
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", script_path.display()))?;
    let reports = script::execute(&mut bench, &script).map_err(|e| e.to_string())?;
    print_reports(&bench, &reports)
}

fn cmd_demo() -> Result<bool, String> {
    let mut bench = Testbench::from_config(&demo_config()).map_err(|e| e.to_string())?;
    let reports = script::execute(&mut bench, &demo_script()).map_err(|e| e.to_string())?;
    print_reports(&bench, &reports)
}

/// Port A sees the store at byte 0x400, port B at byte 0, so each master reads back
/// what the other wrote.
fn demo_script() -> Script {
    let cycle = |master: &str, ops: Vec<OpScript>| {
        Step::Single(CycleScript {
            master: master.into(),
            ops,
        })
    };
    Script {
        reset: Some(ResetStep {
            clock: "wb_a_clk_i".into(),
            signal: "wb_rst_i".into(),
            hold: 10,
            settle: 10,
        }),
        steps: vec![
            cycle("wbm_a", vec![OpScript::write(0x111, 0xdead_beef)]),
            cycle("wbm_a", vec![OpScript::write(0x100, 0xc00f_feee)]),
            cycle(
                "wbm_a",
                vec![
                    OpScript::read(0x111).expecting(0xdead_beef),
                    OpScript::read(0x100).expecting(0xc00f_feee),
                ],
            ),
            cycle("wbm_b", vec![OpScript::write(0x12, 0x10ff_10ff)]),
            cycle("wbm_a", vec![OpScript::read(0x448 >> 2).expecting(0x10ff_10ff)]),
            cycle(
                "wbm_b",
                vec![
                    OpScript::read(0x11).expecting(0xdead_beef),
                    OpScript::read(0x00).expecting(0xc00f_feee),
                ],
            ),
        ],
    }
}

fn demo_config() -> BenchConfig {
    let bus = |side: &str| SignalMap::with_affixes(&format!("wbs_{side}_"), "");
    let mut clk_b = ClockConfig::named("wb_b_clk_i");
    clk_b.period = 7;
    BenchConfig {
        clocks: vec![ClockConfig::named("wb_a_clk_i"), clk_b],
        masters: vec![
            MasterConfig {
                name: "wbm_a".into(),
                clock: "wb_a_clk_i".into(),
                timeout_edges: 10,
                adr_width: 32,
                signals: bus("a"),
            },
            MasterConfig {
                name: "wbm_b".into(),
                clock: "wb_b_clk_i".into(),
                timeout_edges: 10,
                adr_width: 32,
                signals: bus("b"),
            },
        ],
        memories: vec![MemoryConfig {
            name: "openram".into(),
            size_bytes: 1024,
            ports: vec![
                PortConfig {
                    clock: "wb_a_clk_i".into(),
                    base_offset: 0x400,
                    adr_width: 32,
                    signals: bus("a"),
                },
                PortConfig {
                    clock: "wb_b_clk_i".into(),
                    base_offset: 0,
                    adr_width: 32,
                    signals: bus("b"),
                },
            ],
        }],
    }
}

/// Stats of every master named in `reports`, once each, in order of first use.
fn master_stats(bench: &Testbench, reports: &[CycleReport]) -> Vec<Value> {
    let mut ids = Vec::new();
    for id in reports.iter().filter_map(|r| bench.master_id(&r.master)) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids.into_iter()
        .filter_map(|id| bench.master(id))
        .map(|m| json!({ "name": m.name(), "stats": m.stats() }))
        .collect()
}

fn print_reports(bench: &Testbench, reports: &[CycleReport]) -> Result<bool, String> {
    let output = json!({
        "cycles": reports,
        "masters": master_stats(bench, reports),
        "time_fs": bench.now_fs(),
    });
    let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{text}");

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        error!(failed, "cycles failed");
    }
    Ok(failed == 0)
}
