//! Cartridge images for the console.
//!
//! - **cartridge**: Loads cartridge files (21-byte header, then ROM banks, then video banks).

pub mod cartridge;
