//! Bit-packed tile decoding.

pub const TILE_SIZE: usize = 8;
pub const TILE_PIXELS: usize = TILE_SIZE * TILE_SIZE;
pub const BITS_PER_PIXEL: usize = 3;
pub const TILE_BYTES: usize = TILE_PIXELS * BITS_PER_PIXEL / 8;

/// Read `width` (≤ 8) bits starting at `bit_offset`, LSB-first across byte boundaries.
///
/// The value is taken from a 16-bit little-endian window over the byte holding
/// `bit_offset` and the one after it; a byte past the end of `buffer` reads as zero.
pub fn read_bits(buffer: &[u8], bit_offset: usize, width: u32) -> u8 {
    let byte_index = bit_offset / 8;
    let shift = bit_offset % 8;

    let lo = buffer.get(byte_index).copied().unwrap_or(0) as u16;
    let hi = buffer.get(byte_index + 1).copied().unwrap_or(0) as u16;
    let window = lo | (hi << 8);

    let mask = (1u16 << width) - 1;
    ((window >> shift) & mask) as u8
}

/// Unpack a 24-byte tile into 64 palette indices, row-major.
pub fn decode_tile(tile: &[u8; TILE_BYTES]) -> [u8; TILE_PIXELS] {
    let mut pixels = [0; TILE_PIXELS];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = read_bits(tile, i * BITS_PER_PIXEL, BITS_PER_PIXEL as u32);
    }
    pixels
}
