//! CPU emulation for the console.
//!
//! 8 general-purpose registers (R0 is the accumulator), a 16-bit PC and SP, and a
//! Zero/Carry/Negative flags register. Instructions are one byte (5-bit opcode, 3-bit
//! addressing mode) followed by 0-2 operand bytes; `$FF` halts.
//! Bus trait used for memory and I/O.

pub mod cpu;
pub mod flags;

#[cfg(test)]
mod tests;
