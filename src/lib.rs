//! An [`embedded-hal`]-based serial SRAM chip driver.
//!
//! This crate drives 23-series SPI SRAM chips (eg. the 23LC1024) that use a
//! 24-bit address and a mode register selecting byte, page or sequential
//! access. Devices with 16-bit addressing are not supported.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/

#![doc(html_root_url = "https://docs.rs/spi-sram/0.1.0")]
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;
pub mod diagnostics;
mod error;
#[cfg(test)]
mod fake;
#[cfg(test)]
mod mock;
pub mod prelude;
pub mod series23;
mod utils;

pub use crate::error::{Error, LastError};

use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

/// A trait for reading operations from a memory chip.
pub trait Read<Addr, SPI: Transfer<u8>, CS: OutputPin> {
    /// Reads bytes from a memory chip.
    ///
    /// Returns the number of bytes that were actually read from the device.
    ///
    /// # Parameters
    /// * `addr`: The address to start reading at.
    /// * `buf`: The buffer to read `buf.len()` bytes into.
    fn read(&mut self, addr: Addr, buf: &mut [u8]) -> Result<usize, Error<SPI, CS>>;
}

/// A trait for writing operations on a memory chip.
pub trait Write<Addr, SPI: Transfer<u8>, CS: OutputPin> {
    /// Writes bytes onto the memory chip.
    ///
    /// Returns the number of bytes that were actually sent to the device.
    ///
    /// # Parameters
    /// * `addr`: The address to write to.
    /// * `data`: The bytes to write to `addr`.
    fn write(&mut self, addr: Addr, data: &[u8]) -> Result<usize, Error<SPI, CS>>;
}
