//! Bus transaction request and result records.
//!
//! A [`TransactionRequest`] is built by the caller before a cycle starts and is never
//! modified afterwards; the bus master produces exactly one [`TransactionResult`] per
//! request, in submission order.

use serde::Serialize;

use super::constants::{LANE_BITS, LANES, SEL_ALL};
use super::error::{BfmError, MalformedReason};

/// A single read or write transfer within a bus cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Word address driven on `adr`.
    pub address: u64,
    /// Write data; present for writes, absent for reads.
    pub data: Option<u32>,
    /// Byte-lane enable mask driven on `sel` (bit `n` enables bits `8n..8n+8`).
    pub byte_select: u8,
    /// `true` drives `we` high.
    pub is_write: bool,
    /// Edges to hold `stb` low before strobing this request.
    pub idle_edges: u32,
}

impl TransactionRequest {
    /// Full-word read of `address`.
    pub const fn read(address: u64) -> Self {
        Self {
            address,
            data: None,
            byte_select: SEL_ALL,
            is_write: false,
            idle_edges: 0,
        }
    }

    /// Full-word write of `data` to `address`.
    pub const fn write(address: u64, data: u32) -> Self {
        Self::write_masked(address, data, SEL_ALL)
    }

    /// Write of `data` to `address` touching only the lanes enabled in `byte_select`.
    pub const fn write_masked(address: u64, data: u32, byte_select: u8) -> Self {
        Self {
            address,
            data: Some(data),
            byte_select,
            is_write: true,
            idle_edges: 0,
        }
    }

    /// Returns this request with `edges` idle edges inserted before its strobe.
    #[must_use]
    pub const fn with_idle(mut self, edges: u32) -> Self {
        self.idle_edges = edges;
        self
    }

    /// Checks the request is well formed; `index` is its position in the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`BfmError::MalformedRequest`] when the select mask has bits above the lane
    /// bits, when a write has no data, or when a read carries data.
    pub fn validate(&self, index: usize) -> Result<(), BfmError> {
        let reason = if self.byte_select & !SEL_ALL != 0 {
            Some(MalformedReason::InvalidSelect(self.byte_select))
        } else if self.is_write && self.data.is_none() {
            Some(MalformedReason::MissingWriteData)
        } else if !self.is_write && self.data.is_some() {
            Some(MalformedReason::UnexpectedReadData)
        } else {
            None
        };
        reason.map_or(Ok(()), |reason| {
            Err(BfmError::MalformedRequest { index, reason })
        })
    }
}

/// Outcome of one acknowledged transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
    /// Word address of the transfer.
    pub address: u64,
    /// Value sampled from `datrd` on the ack edge.
    pub data_read: u32,
    /// Echo of the submitted write data, if any.
    pub data_write: Option<u32>,
    /// Byte-select mask that was driven.
    pub select: u8,
    /// Master clock edges from strobe to ack, including the ack edge.
    pub wait_edges: u32,
}

/// Expands a 4-bit lane mask into a 32-bit data mask (`0b0101` -> `0x00ff_00ff`).
pub const fn expand_select(sel: u8) -> u32 {
    let mut mask = 0u32;
    let mut lane = 0;
    while lane < LANES {
        if sel & (1 << lane) != 0 {
            mask |= 0xff << (lane as u32 * LANE_BITS);
        }
        lane += 1;
    }
    mask
}
