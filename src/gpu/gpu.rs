//! Background renderer and framebuffer.
//!
//! Each of the 153 background descriptors (tile index, cell x, cell y) at $D100 draws
//! one 8×8 tile from the video window at $A100. Scroll offsets come from I/O $8001/$8002.
//! Pixel coordinates are unsigned: a pixel pushed left of or above the screen by the
//! scroll underflows past the framebuffer bounds and is skipped instead of wrapping.

use crate::{
    bus::{
        Bus, BusError, BACKGROUND_ENTRIES, BACKGROUND_ENTRY_LEN, DESCRIPTOR_BASE, IO_SCROLL_X,
        IO_SCROLL_Y, VIDEO_WINDOW_BASE,
    },
    gpu::bits::{decode_tile, TILE_BYTES, TILE_PIXELS, TILE_SIZE},
};

pub const SCREEN_WIDTH: usize = 128;
pub const SCREEN_HEIGHT: usize = 64;
pub const FRAMEBUFFER_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Fixed 8-color palette (0xRRGGBB). Index 0 = backdrop.
pub const PALETTE_RGB: [u32; 8] = [
    0x1D1D1D, 0xFFFFFF, 0xF5E9BE, 0x9A6ACB, 0x4A90B8, 0x5CAD4A, 0xB84A4A, 0x7D7D7D,
];

/// One background descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub tile_index: u8,
    pub x: u8,
    pub y: u8,
}

pub struct Gpu {
    /// 128×64 palette indices, row-major.
    pub framebuffer: [u8; FRAMEBUFFER_LEN],
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpu {
    pub fn new() -> Self {
        Self {
            framebuffer: [0; FRAMEBUFFER_LEN],
        }
    }

    /// Clear the framebuffer, then draw the background.
    pub fn refresh<B: Bus>(&mut self, bus: &B) -> Result<(), BusError> {
        self.framebuffer.fill(0);
        self.render(bus)
    }

    /// Draw every background descriptor over the current framebuffer contents.
    pub fn render<B: Bus>(&mut self, bus: &B) -> Result<(), BusError> {
        let scroll_x = bus.read(IO_SCROLL_X)? as usize;
        let scroll_y = bus.read(IO_SCROLL_Y)? as usize;

        for entry in 0..BACKGROUND_ENTRIES {
            let descriptor = Self::descriptor(bus, entry)?;
            let tile = Self::tile(bus, descriptor.tile_index)?;
            self.draw_tile(&tile, descriptor, scroll_x, scroll_y);
        }
        Ok(())
    }

    pub fn descriptor<B: Bus>(bus: &B, entry: usize) -> Result<Descriptor, BusError> {
        let base = DESCRIPTOR_BASE + (entry * BACKGROUND_ENTRY_LEN) as u16;
        Ok(Descriptor {
            tile_index: bus.read(base)?,
            x: bus.read(base + 1)?,
            y: bus.read(base + 2)?,
        })
    }

    /// Decoded pixels of tile `index` in the video window.
    pub fn tile<B: Bus>(bus: &B, index: u8) -> Result<[u8; TILE_PIXELS], BusError> {
        let base = VIDEO_WINDOW_BASE + index as u16 * TILE_BYTES as u16;
        let mut raw = [0; TILE_BYTES];
        for (offset, byte) in raw.iter_mut().enumerate() {
            *byte = bus.read(base + offset as u16)?;
        }
        Ok(decode_tile(&raw))
    }

    fn draw_tile(
        &mut self,
        tile: &[u8; TILE_PIXELS],
        descriptor: Descriptor,
        scroll_x: usize,
        scroll_y: usize,
    ) {
        let origin_x = descriptor.x as usize * TILE_SIZE;
        let origin_y = descriptor.y as usize * TILE_SIZE;

        for (i, &pixel) in tile.iter().enumerate() {
            let x = (origin_x + i % TILE_SIZE).wrapping_sub(scroll_x);
            let y = (origin_y + i / TILE_SIZE).wrapping_sub(scroll_y);
            if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
                continue;
            }
            self.framebuffer[x + y * SCREEN_WIDTH] = pixel;
        }
    }

    /// Convert the framebuffer to 0xRRGGBB for the window. Indices wrap at the palette size.
    pub fn to_rgb(&self, out: &mut [u32]) {
        for (dst, &index) in out.iter_mut().zip(self.framebuffer.iter()) {
            *dst = PALETTE_RGB[index as usize % PALETTE_RGB.len()];
        }
    }
}
