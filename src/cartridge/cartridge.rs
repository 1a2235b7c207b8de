//! Cartridge loading from the console's binary image format.
//!
//! Layout (all multi-byte fields little-endian):
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 0      | 2    | entrypoint       |
//! | 2      | 16   | name             |
//! | 18     | 1    | rom_bank_count   |
//! | 19     | 1    | video_bank_count |
//! | 20     | 1    | target_fps       |
//!
//! followed by `rom_bank_count * 16 KiB + video_bank_count * 12 KiB` content bytes:
//! ROM banks first, then video (tile) banks.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

pub const HEADER_LEN: usize = 21;
pub const NAME_LEN: usize = 16;
pub const ROM_BANK_SIZE: usize = 16 * 1024;
pub const VIDEO_BANK_SIZE: usize = 12 * 1024;

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("error reading cartridge {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error reading cartridge stream: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
    #[error("cartridge header should be {HEADER_LEN} bytes, was {len} bytes")]
    TruncatedHeader { len: usize },
    #[error("cartridge content should be {expected} bytes, was {actual} bytes")]
    TruncatedContent { expected: usize, actual: usize },
}

/// Fixed-size cartridge header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub entrypoint: u16,
    pub name: [u8; NAME_LEN],
    pub rom_bank_count: u8,
    pub video_bank_count: u8,
    pub target_fps: u8,
}

impl Header {
    /// Decode the 21 header bytes.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut name = [0; NAME_LEN];
        name.copy_from_slice(&bytes[2..2 + NAME_LEN]);
        Self {
            entrypoint: u16::from_le_bytes([bytes[0], bytes[1]]),
            name,
            rom_bank_count: bytes[18],
            video_bank_count: bytes[19],
            target_fps: bytes[20],
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0; HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.entrypoint.to_le_bytes());
        bytes[2..2 + NAME_LEN].copy_from_slice(&self.name);
        bytes[18] = self.rom_bank_count;
        bytes[19] = self.video_bank_count;
        bytes[20] = self.target_fps;
        bytes
    }

    /// Number of content bytes that follow the header.
    pub fn content_len(&self) -> usize {
        self.rom_bank_count as usize * ROM_BANK_SIZE
            + self.video_bank_count as usize * VIDEO_BANK_SIZE
    }

    /// Game name with trailing padding (spaces/NULs) stripped.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .trim_end_matches([' ', '\0'])
            .to_string()
    }
}

/// Cartridge: header plus the ROM and video banks as one contiguous buffer.
pub struct Cartridge {
    pub header: Header,
    pub content: Vec<u8>,
}

impl Cartridge {
    /// Build a cartridge from parts. `content` is resized to the length the header declares.
    pub fn new(header: Header, mut content: Vec<u8>) -> Self {
        content.resize(header.content_len(), 0);
        Self { header, content }
    }

    /// Load a cartridge file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| CartridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cart = Self::from_bytes(data)?;
        info!(
            "loaded \"{}\" from {}: {} ROM bank(s), {} video bank(s), {} fps, entry ${:04X}",
            cart.header.name(),
            path.display(),
            cart.header.rom_bank_count,
            cart.header.video_bank_count,
            cart.header.target_fps,
            cart.header.entrypoint
        );
        Ok(cart)
    }

    /// Read a header and its content from any byte stream, until EOF.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, CartridgeError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|source| CartridgeError::Read { source })?;
        Self::from_bytes(data)
    }

    fn from_bytes(mut data: Vec<u8>) -> Result<Self, CartridgeError> {
        let header_bytes: &[u8; HEADER_LEN] = data
            .get(..HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(CartridgeError::TruncatedHeader { len: data.len() })?;
        let header = Header::parse(header_bytes);

        let expected = header.content_len();
        let mut content = data.split_off(HEADER_LEN);
        if content.len() < expected {
            return Err(CartridgeError::TruncatedContent {
                expected,
                actual: content.len(),
            });
        }
        if content.len() > expected {
            warn!(
                "ignoring {} byte(s) past the declared cartridge content",
                content.len() - expected
            );
            content.truncate(expected);
        }

        Ok(Self { header, content })
    }
}
