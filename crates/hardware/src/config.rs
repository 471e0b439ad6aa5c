//! Configuration system for the bus functional model.
//!
//! This module defines the structures used to describe a bench. It provides:
//! 1. **Defaults:** Baseline values for clocks, timeouts, store size and address width.
//! 2. **Structures:** Clocks, masters and memories with their ports and signal maps.
//! 3. **Loading:** JSON parsing from text or file, followed by semantic validation.
//!
//! Signal maps have no defaults: every role must be bound by the caller.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;
use crate::signals::SignalMap;
use crate::sim::TimeUnit;

/// Default configuration constants.
mod defaults {
    use crate::sim::TimeUnit;

    /// Clock period in `CLOCK_UNIT`s.
    pub const CLOCK_PERIOD: u64 = 10;

    /// Unit of the default clock period (10 us, as in the reference test bench).
    pub const CLOCK_UNIT: TimeUnit = TimeUnit::Us;

    /// Rising edges a master waits for ack after strobing.
    pub const TIMEOUT_EDGES: u32 = 10;

    /// Size of a memory's backing store in bytes (256 words).
    pub const STORE_SIZE: usize = 1024;

    /// Width of the `adr` signal in bits.
    pub const ADR_WIDTH: u32 = 32;
}

/// Root bench description.
///
/// # Examples
///
/// ```
/// use wishbone_bfm::config::BenchConfig;
///
/// let json = r#"{
///     "clocks": [{ "name": "clk_a" }],
///     "masters": [{
///         "name": "wbm_a",
///         "clock": "clk_a",
///         "signals": {
///             "cyc": "cyc", "stb": "stb", "we": "we", "adr": "adr",
///             "sel": "sel", "datwr": "dat_w", "datrd": "dat_r", "ack": "ack"
///         }
///     }],
///     "memories": [{
///         "name": "ram",
///         "ports": [{
///             "clock": "clk_a",
///             "signals": {
///                 "cyc": "cyc", "stb": "stb", "we": "we", "adr": "adr",
///                 "sel": "sel", "datwr": "dat_w", "datrd": "dat_r", "ack": "ack"
///             }
///         }]
///     }]
/// }"#;
///
/// let config = BenchConfig::from_json(json).unwrap();
/// assert_eq!(config.masters[0].timeout_edges, 10);
/// assert_eq!(config.memories[0].size_bytes, 1024);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchConfig {
    /// Clock domains.
    #[serde(default)]
    pub clocks: Vec<ClockConfig>,
    /// Bus masters.
    #[serde(default)]
    pub masters: Vec<MasterConfig>,
    /// Memory slaves.
    #[serde(default)]
    pub memories: Vec<MemoryConfig>,
}

impl BenchConfig {
    /// Parses and validates a JSON bench description.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`] if validation fails.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON bench description from a file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as [`BenchConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks the description is internally consistent.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first problem: duplicate or dangling names,
    /// zero periods, timeouts, store sizes or address widths, or unmapped signal roles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut clocks = HashSet::new();
        for clock in &self.clocks {
            if !clocks.insert(clock.name.as_str()) {
                return Err(invalid(format!("duplicate clock `{}`", clock.name)));
            }
            if clock.period == 0 {
                return Err(invalid(format!("clock `{}` has a zero period", clock.name)));
            }
        }
        let check_clock = |owner: &str, clock: &str| {
            if clocks.contains(clock) {
                Ok(())
            } else {
                Err(invalid(format!("`{owner}` refers to unknown clock `{clock}`")))
            }
        };
        let check_bus = |owner: &str, signals: &SignalMap, adr_width: u32| {
            if let Some(role) = signals.first_missing() {
                return Err(invalid(format!("`{owner}` does not map signal role `{role}`")));
            }
            if adr_width == 0 || adr_width > u64::BITS {
                return Err(invalid(format!("`{owner}` has address width {adr_width}")));
            }
            Ok(())
        };

        let mut masters = HashSet::new();
        for master in &self.masters {
            if !masters.insert(master.name.as_str()) {
                return Err(invalid(format!("duplicate master `{}`", master.name)));
            }
            check_clock(&master.name, &master.clock)?;
            check_bus(&master.name, &master.signals, master.adr_width)?;
            if master.timeout_edges == 0 {
                return Err(invalid(format!("master `{}` has a zero timeout", master.name)));
            }
        }

        let mut memories = HashSet::new();
        for memory in &self.memories {
            if !memories.insert(memory.name.as_str()) {
                return Err(invalid(format!("duplicate memory `{}`", memory.name)));
            }
            if memory.size_bytes == 0 {
                return Err(invalid(format!("memory `{}` has zero size", memory.name)));
            }
            if memory.ports.is_empty() {
                return Err(invalid(format!("memory `{}` has no ports", memory.name)));
            }
            for port in &memory.ports {
                check_clock(&memory.name, &port.clock)?;
                check_bus(&memory.name, &port.signals, port.adr_width)?;
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

/// Clock domain description.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// Domain name referenced by masters and ports.
    pub name: String,

    /// Clock period in `unit`s.
    #[serde(default = "ClockConfig::default_period")]
    pub period: u64,

    /// Unit of `period`.
    #[serde(default = "ClockConfig::default_unit")]
    pub unit: TimeUnit,
}

impl ClockConfig {
    /// Returns the default clock period.
    fn default_period() -> u64 {
        defaults::CLOCK_PERIOD
    }

    /// Returns the default clock period unit.
    fn default_unit() -> TimeUnit {
        defaults::CLOCK_UNIT
    }

    /// Clock with the default period.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            period: defaults::CLOCK_PERIOD,
            unit: defaults::CLOCK_UNIT,
        }
    }
}

/// Bus master description.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterConfig {
    /// Master name.
    pub name: String,

    /// Clock domain the master runs on.
    pub clock: String,

    /// Rising edges to wait for ack after a strobe.
    #[serde(default = "MasterConfig::default_timeout_edges")]
    pub timeout_edges: u32,

    /// Width of the `adr` signal in bits.
    #[serde(default = "default_adr_width")]
    pub adr_width: u32,

    /// Role-to-signal map; every role is required.
    pub signals: SignalMap,
}

impl MasterConfig {
    /// Returns the default ack timeout in edges.
    fn default_timeout_edges() -> u32 {
        defaults::TIMEOUT_EDGES
    }
}

/// Memory slave description.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory name.
    pub name: String,

    /// Backing store size in bytes.
    #[serde(default = "MemoryConfig::default_size_bytes")]
    pub size_bytes: usize,

    /// Bus interfaces onto the store.
    pub ports: Vec<PortConfig>,
}

impl MemoryConfig {
    /// Returns the default backing store size.
    fn default_size_bytes() -> usize {
        defaults::STORE_SIZE
    }
}

/// One bus interface of a memory.
#[derive(Debug, Clone, Deserialize)]
pub struct PortConfig {
    /// Clock domain the port responds on.
    pub clock: String,

    /// Byte address at which the port's window onto the store begins.
    #[serde(default)]
    pub base_offset: u64,

    /// Width of the `adr` signal in bits.
    #[serde(default = "default_adr_width")]
    pub adr_width: u32,

    /// Role-to-signal map; every role is required.
    pub signals: SignalMap,
}

/// Returns the default address width.
const fn default_adr_width() -> u32 {
    defaults::ADR_WIDTH
}
