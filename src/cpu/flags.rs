//! Flags register bits.

pub const FLAG_ZERO: u8 = 1 << 0;
pub const FLAG_CARRY: u8 = 1 << 1;
pub const FLAG_NEGATIVE: u8 = 1 << 2;
