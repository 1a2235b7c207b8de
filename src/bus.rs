//! Memory bus and address decoding for the console.
//!
//! Maps CPU addresses to the cartridge banks, I/O registers, RAM, the tile
//! descriptor table, and the stack. Ranges are decoded in order; the first match wins:
//!
//! | Range         | Region                                         |
//! |---------------|------------------------------------------------|
//! | $0000-$3FFF   | fixed ROM bank (`content[addr & $3FFF]`)       |
//! | $4000-$7FFF   | switchable ROM bank (`content[addr]`)          |
//! | $8000-$80FF   | I/O registers                                  |
//! | $8100-$A0FF   | RAM (8 KiB)                                    |
//! | $A100-$D0FF   | video bank window, read-only                   |
//! | $D100-$D36B   | tile/sprite descriptor table (619 bytes)       |
//! | $D36C-$FFFF   | stack (indexed from $D200)                     |

use log::debug;
use thiserror::Error;

use crate::cartridge::cartridge::{Cartridge, ROM_BANK_SIZE};

/// Write 1 to request a GPU refresh; cleared once serviced.
pub const IO_GPU_REFRESH: u16 = 0x8000;
pub const IO_SCROLL_X: u16 = 0x8001;
pub const IO_SCROLL_Y: u16 = 0x8002;
/// ROM bank pointer. Defined by the hardware map but not applied by the decoder.
pub const IO_ROM_BANK: u16 = 0x8003;
/// Video bank pointer. Defined by the hardware map but not applied by the decoder.
pub const IO_VIDEO_BANK: u16 = 0x8004;
/// Controller snapshot, written after every serviced refresh.
pub const IO_INPUT: u16 = 0x8005;

pub const IO_LEN: usize = 0x100;
pub const RAM_LEN: usize = 0x2000;
pub const VIDEO_WINDOW_BASE: u16 = 0xA100;
pub const VIDEO_WINDOW_LEN: usize = 0x3000;
const VIDEO_WINDOW_END: u16 = VIDEO_WINDOW_BASE + (VIDEO_WINDOW_LEN - 1) as u16;
pub const DESCRIPTOR_BASE: u16 = 0xD100;
/// Background (17×9×3 = 459 bytes) plus sprites (40×4 = 160 bytes).
pub const DESCRIPTOR_LEN: usize =
    BACKGROUND_ENTRIES * BACKGROUND_ENTRY_LEN + SPRITE_ENTRIES * SPRITE_ENTRY_LEN;
pub const STACK_BASE: u16 = 0xD200;
pub const STACK_LEN: usize = 0x10000 - STACK_BASE as usize;

pub const BACKGROUND_COLUMNS: usize = 17;
pub const BACKGROUND_ROWS: usize = 9;
pub const BACKGROUND_ENTRIES: usize = BACKGROUND_COLUMNS * BACKGROUND_ROWS;
pub const BACKGROUND_ENTRY_LEN: usize = 3;
pub const SPRITE_ENTRIES: usize = 40;
pub const SPRITE_ENTRY_LEN: usize = 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("write to read-only video window at ${addr:04X}")]
    ReadOnly { addr: u16 },
    #[error("access to switchable bank at ${addr:04X} with a single ROM bank")]
    SingleBank { addr: u16 },
    #[error("${addr:04X} maps to cartridge byte {index}, past its {len} byte(s)")]
    ContentOutOfRange { addr: u16, index: usize, len: usize },
}

/// Trait for memory-mapped access used by the CPU and the GPU.
pub trait Bus {
    fn read(&self, addr: u16) -> Result<u8, BusError>;
    fn write(&mut self, addr: u16, data: u8) -> Result<(), BusError>;
}

/// Backing store an address decodes to, with the index inside that store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    FixedBank(usize),
    SwitchableBank(usize),
    Io(usize),
    Ram(usize),
    VideoWindow(usize),
    Descriptors(usize),
    Stack(usize),
}

impl Region {
    pub fn decode(addr: u16) -> Self {
        match addr {
            0x0000..=0x3FFF => Region::FixedBank((addr & 0x3FFF) as usize),
            0x4000..=0x7FFF => Region::SwitchableBank(addr as usize),
            0x8000..=0x80FF => Region::Io((addr & 0xFF) as usize),
            0x8100..=0xA0FF => Region::Ram((addr - 0x8100) as usize),
            VIDEO_WINDOW_BASE..=VIDEO_WINDOW_END => {
                Region::VideoWindow((addr - VIDEO_WINDOW_BASE) as usize + ROM_BANK_SIZE)
            }
            0xD100..=0xD36B => Region::Descriptors((addr - DESCRIPTOR_BASE) as usize),
            0xD36C..=0xFFFF => Region::Stack((addr - STACK_BASE) as usize),
        }
    }
}

/// The console address space: cartridge plus the console's own memories.
pub struct AddressSpace {
    pub cart: Cartridge,
    pub io: [u8; IO_LEN],
    pub ram: [u8; RAM_LEN],
    pub descriptors: [u8; DESCRIPTOR_LEN],
    pub stack: [u8; STACK_LEN],
}

impl AddressSpace {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            io: [0; IO_LEN],
            ram: [0; RAM_LEN],
            descriptors: [0; DESCRIPTOR_LEN],
            stack: [0; STACK_LEN],
        }
    }

    /// True when the program has requested a GPU refresh.
    pub fn refresh_requested(&self) -> bool {
        self.io[(IO_GPU_REFRESH & 0xFF) as usize] == 1
    }

    pub fn clear_refresh(&mut self) {
        self.io[(IO_GPU_REFRESH & 0xFF) as usize] = 0;
    }

    /// Latch the controller state into the input register.
    pub fn set_input(&mut self, snapshot: u8) {
        self.io[(IO_INPUT & 0xFF) as usize] = snapshot;
    }

    pub fn scroll(&self) -> (u8, u8) {
        (
            self.io[(IO_SCROLL_X & 0xFF) as usize],
            self.io[(IO_SCROLL_Y & 0xFF) as usize],
        )
    }

    /// Place background entry `i` at cell `(i % 16, i / 16)` showing tile `i`.
    pub fn seed_background_layout(&mut self) {
        for (i, entry) in self
            .descriptors
            .chunks_exact_mut(BACKGROUND_ENTRY_LEN)
            .take(BACKGROUND_ENTRIES)
            .enumerate()
        {
            entry[0] = i as u8;
            entry[1] = (i % 16) as u8;
            entry[2] = (i / 16) as u8;
        }
        debug!("seeded {BACKGROUND_ENTRIES} background descriptors");
    }

    fn multi_bank(&self, addr: u16) -> Result<(), BusError> {
        if self.cart.header.rom_bank_count > 1 {
            Ok(())
        } else {
            Err(BusError::SingleBank { addr })
        }
    }

    fn content_index(&self, addr: u16, index: usize) -> Result<usize, BusError> {
        if index < self.cart.content.len() {
            Ok(index)
        } else {
            Err(BusError::ContentOutOfRange {
                addr,
                index,
                len: self.cart.content.len(),
            })
        }
    }
}

impl Bus for AddressSpace {
    fn read(&self, addr: u16) -> Result<u8, BusError> {
        match Region::decode(addr) {
            Region::FixedBank(i) | Region::VideoWindow(i) => {
                Ok(self.cart.content[self.content_index(addr, i)?])
            }
            Region::SwitchableBank(i) => {
                self.multi_bank(addr)?;
                Ok(self.cart.content[self.content_index(addr, i)?])
            }
            Region::Io(i) => Ok(self.io[i]),
            Region::Ram(i) => Ok(self.ram[i]),
            Region::Descriptors(i) => Ok(self.descriptors[i]),
            Region::Stack(i) => Ok(self.stack[i]),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), BusError> {
        match Region::decode(addr) {
            Region::FixedBank(i) => {
                let i = self.content_index(addr, i)?;
                self.cart.content[i] = data;
            }
            Region::SwitchableBank(i) => {
                self.multi_bank(addr)?;
                let i = self.content_index(addr, i)?;
                self.cart.content[i] = data;
            }
            Region::Io(i) => self.io[i] = data,
            Region::Ram(i) => self.ram[i] = data,
            Region::VideoWindow(_) => return Err(BusError::ReadOnly { addr }),
            Region::Descriptors(i) => self.descriptors[i] = data,
            Region::Stack(i) => self.stack[i] = data,
        }
        Ok(())
    }
}
