//! Fantasy8: a fantasy 8-bit game console written in Rust.
//!
//! A one-byte-instruction CPU, a 16-bit address space multiplexed across the cartridge
//! banks and the console's own memories, and a tile-based background GPU.
//!
//! ## Modules
//!
//! - **bus** – address decoding: fixed/switchable ROM banks, I/O, RAM, video window,
//!   descriptor table, stack
//! - **cartridge** – cartridge image loading (header + ROM banks + video banks)
//! - **console** – CPU step, then GPU refresh servicing and input latching
//! - **controller** – buttons to the $8005 input snapshot
//! - **cpu** – registers, flags, addressing modes, the 14 opcodes, halt
//! - **error** – crate-wide fatal error type
//! - **gpu** – 3bpp tile decode and the 128×64 palette-index framebuffer

pub mod bus;
pub mod cartridge;
pub mod console;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod gpu;
