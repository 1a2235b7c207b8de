//! Tile GPU for the console.
//!
//! Background-only renderer: 153 descriptors place 8×8 tiles (3 bits per pixel, 24 bytes
//! per tile) from the video bank window onto a 128×64 palette-index framebuffer, offset
//! by the scroll registers. Rendering happens only when the program requests a refresh.

pub mod bits;
pub mod gpu;
