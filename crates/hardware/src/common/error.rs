//! Error definitions for the bus functional model.
//!
//! This module defines the failure modes surfaced to callers. It provides:
//! 1. **Protocol errors:** Ack timeouts and malformed requests raised by the bus master.
//! 2. **Wiring errors:** Missing or unknown signal mappings found while resolving a bus.
//! 3. **Configuration errors:** I/O, parse and validation failures when loading a bench.
//!
//! Out-of-range memory accesses are deliberately absent: the memory slave clamps reads
//! and drops writes outside its store instead of failing the simulation.

use thiserror::Error;

use crate::signals::roles::SignalRole;

/// Reason a [`TransactionRequest`](crate::common::TransactionRequest) was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// The byte-select mask has bits set outside the four lane bits.
    InvalidSelect(u8),
    /// A write request carries no write data.
    MissingWriteData,
    /// A read request carries write data.
    UnexpectedReadData,
    /// Address does not fit the host's `adr` signal of the given width.
    AddressTooWide {
        /// Requested word address.
        address: u64,
        /// Width of the `adr` signal in bits.
        width: u32,
    },
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSelect(mask) => write!(f, "byte select {mask:#04b} exceeds lane mask"),
            Self::MissingWriteData => write!(f, "write request has no data"),
            Self::UnexpectedReadData => write!(f, "read request carries write data"),
            Self::AddressTooWide { address, width } => {
                write!(f, "address {address:#x} does not fit a {width}-bit adr signal")
            }
        }
    }
}

/// Errors raised by the bus master, the signal resolver and the reference host.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BfmError {
    /// Ack was not observed within the configured edge budget after a strobe.
    #[error("no ack for request {index} at address {address:#x} within {edges} clock edges")]
    ProtocolTimeout {
        /// Position of the stalled request within its cycle.
        index: usize,
        /// Word address of the stalled request.
        address: u64,
        /// Edge budget that was exhausted.
        edges: u32,
    },

    /// A request was rejected before any signal was driven.
    #[error("malformed request {index}: {reason}")]
    MalformedRequest {
        /// Position of the offending request within its cycle.
        index: usize,
        /// Why the request was rejected.
        reason: MalformedReason,
    },

    /// A cycle was submitted with no requests.
    #[error("bus cycle contains no requests")]
    EmptyCycle,

    /// A cycle was submitted while another one is still in flight on the same master.
    #[error("bus master `{0}` already has a cycle in flight")]
    MasterBusy(String),

    /// A signal role has no entry in the signal map.
    #[error("signal role `{0}` is not mapped")]
    MissingSignal(SignalRole),

    /// A signal role maps to a name the host does not know.
    #[error("signal `{name}` mapped to role `{role}` does not exist")]
    UnknownSignal {
        /// The role being resolved.
        role: SignalRole,
        /// The physical signal name that failed to resolve.
        name: String,
    },

    /// A clock domain name does not match any registered domain.
    #[error("unknown clock domain `{0}`")]
    UnknownClock(String),

    /// A master id or name does not match any attached master.
    #[error("unknown bus master `{0}`")]
    UnknownMaster(String),

    /// A memory id or name does not match any registered memory.
    #[error("unknown memory `{0}`")]
    UnknownMemory(String),
}

/// Errors raised while loading or validating a bench configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid JSON for the expected schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but describes an impossible bench.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Wiring the bench from a valid configuration failed.
    #[error(transparent)]
    Bfm(#[from] BfmError),
}
