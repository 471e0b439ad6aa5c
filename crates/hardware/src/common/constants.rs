//! Bus geometry constants shared by the master and slave models.

/// Number of byte lanes on the 32-bit data bus.
pub const LANES: usize = 4;

/// Width of one byte lane in bits.
pub const LANE_BITS: u32 = 8;

/// Width of the `datwr`/`datrd` data buses in bits.
pub const DATA_BITS: u32 = 32;

/// Width of the `sel` byte-select bus in bits (one bit per lane).
pub const SEL_BITS: u32 = LANES as u32;

/// Select mask with every lane enabled.
pub const SEL_ALL: u8 = 0b1111;

/// Shift converting a word address on `adr` into a byte address.
pub const WORD_SHIFT: u32 = 2;

/// Width of single-bit control signals (`cyc`, `stb`, `we`, `ack`).
pub const CONTROL_BITS: u32 = 1;
