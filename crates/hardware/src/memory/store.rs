//! Byte-addressable backing store.
//!
//! Fixed-size, zero-initialized byte array behind the memory slave. Word accesses are
//! little-endian. Accesses outside the array are a soft boundary: reads see zero and
//! writes are dropped, and the caller is told which happened so it can count them.

use std::ops::{Index, IndexMut};

use crate::common::constants::{LANE_BITS, LANES};

/// Outcome of a lane-masked word write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaneWrite {
    /// Lanes whose byte was stored.
    pub written: u32,
    /// Enabled lanes that fell outside the store and were dropped.
    pub dropped: u32,
}

/// Zero-initialized byte array of fixed size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackingStore {
    bytes: Vec<u8>,
}

impl BackingStore {
    /// Creates a store of `size` bytes, all zero.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Returns the size of the store in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-sized store.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn slot(&self, addr: u64) -> Option<usize> {
        usize::try_from(addr).ok().filter(|&i| i < self.bytes.len())
    }

    /// Returns `true` if all four bytes of the word at `addr` lie inside the store.
    pub fn contains_word(&self, addr: u64) -> bool {
        addr.checked_add(LANES as u64 - 1)
            .is_some_and(|last| self.slot(last).is_some())
    }

    /// Reads one byte; out-of-range bytes read as zero.
    pub fn read_u8(&self, addr: u64) -> u8 {
        self.slot(addr).map_or(0, |i| self.bytes[i])
    }

    /// Writes one byte; returns `false` if `addr` is outside the store and nothing was written.
    pub fn write_u8(&mut self, addr: u64, val: u8) -> bool {
        match self.slot(addr) {
            Some(i) => {
                self.bytes[i] = val;
                true
            }
            None => false,
        }
    }

    /// Little-endian word load at byte address `addr`, zero-filling out-of-range bytes.
    pub fn read_word_le(&self, addr: u64) -> u32 {
        let mut word = [0u8; LANES];
        for (lane, byte) in word.iter_mut().enumerate() {
            *byte = addr
                .checked_add(lane as u64)
                .map_or(0, |a| self.read_u8(a));
        }
        u32::from_le_bytes(word)
    }

    /// Stores the lanes of `data` enabled in `sel` at byte address `addr`.
    ///
    /// Lane `n` holds `(data >> 8n) & 0xff` and lands at `addr + n`; lanes with a clear
    /// select bit are left untouched.
    pub fn write_lanes(&mut self, addr: u64, data: u32, sel: u8) -> LaneWrite {
        let mut outcome = LaneWrite::default();
        for lane in 0..LANES {
            if sel & (1 << lane) == 0 {
                continue;
            }
            let byte = (data >> (lane as u32 * LANE_BITS)) as u8;
            let stored = addr
                .checked_add(lane as u64)
                .is_some_and(|a| self.write_u8(a, byte));
            if stored {
                outcome.written += 1;
            } else {
                outcome.dropped += 1;
            }
        }
        outcome
    }

    /// Copies `data` into the store at `offset`.
    ///
    /// Returns `false` and leaves the store untouched if the slice does not fit.
    pub fn load(&mut self, offset: usize, data: &[u8]) -> bool {
        match offset.checked_add(data.len()) {
            Some(end) if end <= self.bytes.len() => {
                self.bytes[offset..end].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    /// Returns the raw contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Zeroes every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

/// Direct byte access for preloading and inspection.
///
/// Unlike the bus-facing accessors this is not soft: use [`BackingStore::read_u8`] and
/// [`BackingStore::write_u8`] where the address may fall outside the store.
impl Index<usize> for BackingStore {
    type Output = u8;

    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    fn index(&self, index: usize) -> &Self::Output {
        &self.bytes[index]
    }
}

impl IndexMut<usize> for BackingStore {
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bytes[index]
    }
}
