//! Crate-wide error type. Every variant is fatal to the running console.

use thiserror::Error;

use crate::{bus::BusError, cartridge::cartridge::CartridgeError, cpu::cpu::CpuError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error("GPU refresh: {0}")]
    Gpu(#[from] BusError),
}
