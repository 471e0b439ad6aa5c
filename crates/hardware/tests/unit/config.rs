//! # Configuration Tests
//!
//! Tests for bench descriptions: deserialization defaults, semantic validation,
//! file loading and building a testbench from a description.

use std::io::Write;

use tempfile::NamedTempFile;
use wishbone_bfm::config::{BenchConfig, ClockConfig};
use wishbone_bfm::sim::TimeUnit;
use wishbone_bfm::{ConfigError, Testbench};

use crate::common::harness::DUAL_PORT_JSON;

const ROLES: &str = r#"{
    "cyc": "cyc", "stb": "stb", "we": "we", "adr": "adr",
    "sel": "sel", "datwr": "dat_w", "datrd": "dat_r", "ack": "ack"
}"#;

fn bench_json(clock: &str, master_extra: &str, memory_extra: &str) -> String {
    format!(
        r#"{{
            "clocks": [{clock}],
            "masters": [{{ "name": "wbm", "clock": "clk", "signals": {ROLES} {master_extra} }}],
            "memories": [{{ "name": "ram", "ports": [{{ "clock": "clk", "signals": {ROLES} }}]
                {memory_extra} }}]
        }}"#
    )
}

fn invalid_message(text: &str) -> String {
    match BenchConfig::from_json(text) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn test_config_defaults() {
    let config = BenchConfig::from_json(&bench_json(r#"{ "name": "clk" }"#, "", "")).unwrap();
    assert_eq!(config.clocks[0].period, 10);
    assert_eq!(config.clocks[0].unit, TimeUnit::Us);
    assert_eq!(config.masters[0].timeout_edges, 10);
    assert_eq!(config.masters[0].adr_width, 32);
    assert_eq!(config.memories[0].size_bytes, 1024);
    assert_eq!(config.memories[0].ports[0].base_offset, 0);
}

#[test]
fn test_empty_config_is_valid() {
    let config = BenchConfig::from_json("{}").unwrap();
    assert!(config.clocks.is_empty());
    assert!(config.masters.is_empty());
    assert!(config.memories.is_empty());
}

#[test]
fn test_named_clock_uses_defaults() {
    let clock = ClockConfig::named("clk");
    assert_eq!(clock.name, "clk");
    assert_eq!(clock.period, 10);
    assert_eq!(clock.unit, TimeUnit::Us);
}

#[test]
fn test_dual_port_description() {
    let config = BenchConfig::from_json(DUAL_PORT_JSON).unwrap();
    assert_eq!(config.clocks[1].unit, TimeUnit::Ns);
    assert_eq!(config.memories[0].ports.len(), 2);
    assert_eq!(config.memories[0].ports[0].base_offset, 0x400);
}

// ══════════════════════════════════════════════════════════
// 2. Validation
// ══════════════════════════════════════════════════════════

#[test]
fn test_rejects_zero_period() {
    let message = invalid_message(&bench_json(r#"{ "name": "clk", "period": 0 }"#, "", ""));
    assert!(message.contains("zero period"), "{message}");
}

#[test]
fn test_rejects_duplicate_clock() {
    let message = invalid_message(&bench_json(r#"{ "name": "clk" }, { "name": "clk" }"#, "", ""));
    assert!(message.contains("duplicate clock"), "{message}");
}

#[test]
fn test_rejects_unknown_clock() {
    let message = invalid_message(&bench_json(r#"{ "name": "other" }"#, "", ""));
    assert!(message.contains("unknown clock `clk`"), "{message}");
}

#[test]
fn test_rejects_zero_timeout() {
    let text = bench_json(r#"{ "name": "clk" }"#, r#", "timeout_edges": 0"#, "");
    let message = invalid_message(&text);
    assert!(message.contains("zero timeout"), "{message}");
}

#[test]
fn test_rejects_bad_address_width() {
    let message = invalid_message(&bench_json(r#"{ "name": "clk" }"#, r#", "adr_width": 65"#, ""));
    assert!(message.contains("address width 65"), "{message}");
}

#[test]
fn test_rejects_zero_size_memory() {
    let message = invalid_message(&bench_json(r#"{ "name": "clk" }"#, "", r#", "size_bytes": 0"#));
    assert!(message.contains("zero size"), "{message}");
}

#[test]
fn test_rejects_memory_without_ports() {
    let text = r#"{ "memories": [{ "name": "ram", "ports": [] }] }"#;
    assert!(invalid_message(text).contains("no ports"));
}

#[test]
fn test_rejects_missing_role() {
    let text = r#"{
        "clocks": [{ "name": "clk" }],
        "masters": [{ "name": "wbm", "clock": "clk", "signals": { "cyc": "cyc", "stb": "stb" } }]
    }"#;
    let message = invalid_message(text);
    assert!(message.contains("signal role `we`"), "{message}");
}

#[test]
fn test_rejects_malformed_json() {
    assert!(matches!(
        BenchConfig::from_json(r#"{ "clocks": [{ "name": 3 }] }"#),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        BenchConfig::from_json(r#"{ "clocks": [{ "name": "c", "unit": "hours" }] }"#),
        Err(ConfigError::Parse(_))
    ));
}

// ══════════════════════════════════════════════════════════
// 3. Loading and building
// ══════════════════════════════════════════════════════════

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(DUAL_PORT_JSON.as_bytes()).unwrap();
    file.flush().unwrap();
    let config = BenchConfig::from_file(file.path()).unwrap();
    assert_eq!(config.masters.len(), 2);
}

#[test]
fn test_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = BenchConfig::from_file(dir.path().join("missing.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_testbench_from_config() {
    let config = BenchConfig::from_json(DUAL_PORT_JSON).unwrap();
    let tb = Testbench::from_config(&config).unwrap();
    assert_eq!(tb.signals().len(), 16);
    assert!(tb.master_id("wbm_a").is_some());
    assert!(tb.master_id("wbm_c").is_none());
    let memory = tb.memory(tb.memory_id("openram").unwrap()).unwrap();
    assert_eq!(memory.port_count(), 2);
    assert_eq!(memory.store().len(), 1024);
    assert_eq!(tb.clock(tb.domain("wb_b_clk_i").unwrap()).unwrap().period_fs(), 7_000_000);
}

#[test]
fn test_testbench_from_invalid_config() {
    let mut config = BenchConfig::from_json(DUAL_PORT_JSON).unwrap();
    config.masters[1].clock = "nowhere".into();
    assert!(matches!(
        Testbench::from_config(&config),
        Err(ConfigError::Invalid(_))
    ));
}
