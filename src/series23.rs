//! Driver for 23-series serial SRAM chips.

use crate::diagnostics::{Diagnostics, NoDiagnostics};
use crate::utils::HexSlice;
use crate::{Error, LastError, Read, Write};
use bitflags::bitflags;
use core::fmt;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi;

/// Capacity assumed by [`Sram::new`] callers that don't know better: 1 Mbit.
pub const DEFAULT_KILOBITS: u32 = 1024;

/// The largest page length accepted in [`Mode::Page`].
pub const MAX_PAGE_LENGTH: usize = 32;

/// Only 24 address bits go out on the wire.
const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Shifted out while reading, the device ignores it.
const FILLER: u8 = 0xFF;

/// Payloads are staged through a stack buffer of this size.
const CHUNK_LEN: usize = 32;

/// Bit order of SPI transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Most significant bit first.
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

/// SPI bus parameters the device expects.
///
/// The blocking `embedded-hal` traits don't carry per-transaction settings,
/// so the SPI master passed to [`Sram::new`] must already be configured with
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    /// SCK frequency in Hz.
    pub clock_hz: u32,
    /// Bit order of every byte.
    pub bit_order: BitOrder,
    /// SPI mode number (0-3).
    pub spi_mode: u8,
}

impl BusSettings {
    /// Returns the clock polarity and phase as an `embedded-hal` mode.
    pub fn hal_mode(&self) -> spi::Mode {
        match self.spi_mode & 0b11 {
            0 => spi::MODE_0,
            1 => spi::MODE_1,
            2 => spi::MODE_2,
            _ => spi::MODE_3,
        }
    }
}

/// Bus settings used for all 23-series devices: 1 MHz, MSB first, mode 0.
pub const BUS_SETTINGS: BusSettings = BusSettings {
    clock_hz: 1_000_000,
    bit_order: BitOrder::MsbFirst,
    spi_mode: 0,
};

#[allow(unused)] // dual I/O transfers are not supported
#[derive(Debug, Clone, Copy)]
enum Opcode {
    Read = 0x03,
    Write = 0x02,
    /// Enter dual I/O (SDI) access.
    EnterDualIo = 0x3B,
    /// Return to plain SPI access from SDI/SQI.
    ResetIo = 0xFF,
    /// Read the 8-bit mode register.
    ReadMode = 0x05,
    /// Write the 8-bit mode register.
    WriteMode = 0x01,
}

bitflags! {
    /// Mode register bits.
    pub struct ModeRegister: u8 {
        /// Sequential access.
        const SEQUENTIAL = 1 << 6;
        /// Page access.
        const PAGE = 1 << 7;
        /// Both mode bits. Setting both is reserved.
        const MODE = 0b1100_0000;
    }
}

/// Addressing mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One byte per command.
    Byte,
    /// Up to the configured page length per command.
    Page,
    /// Any number of bytes per command, the device increments the address.
    Sequential,
    /// No mode has been configured yet.
    Uninitialized,
}

impl Mode {
    fn register(self) -> Option<ModeRegister> {
        match self {
            Mode::Byte => Some(ModeRegister::empty()),
            Mode::Page => Some(ModeRegister::PAGE),
            Mode::Sequential => Some(ModeRegister::SEQUENTIAL),
            Mode::Uninitialized => None,
        }
    }

    fn from_register(register: ModeRegister) -> Self {
        let bits = register & ModeRegister::MODE;
        if bits == ModeRegister::empty() {
            Mode::Byte
        } else if bits == ModeRegister::PAGE {
            Mode::Page
        } else if bits == ModeRegister::SEQUENTIAL {
            Mode::Sequential
        } else {
            Mode::Uninitialized
        }
    }
}

/// Driver for 23-series serial SRAM chips.
///
/// Every operation holds CS low for the duration of one command and always
/// releases it again, also when validation or the SPI transfer fails. The
/// driver does no locking of its own; callers sharing one instance must
/// serialize access.
///
/// # Type Parameters
///
/// * **`SPI`**: The SPI master to which the SRAM chip is attached.
/// * **`CS`**: The **C**hip-**S**elect line attached to the `\CS` pin of
///   the SRAM chip.
/// * **`D`**: Sink for failure reports, see [`Diagnostics`].
#[derive(Debug)]
pub struct Sram<SPI: Transfer<u8>, CS: OutputPin, D = NoDiagnostics> {
    spi: SPI,
    cs: CS,
    capacity: u32,
    mode: Mode,
    page_length: usize,
    last_error: LastError,
    diagnostics: D,
}

impl<SPI: Transfer<u8>, CS: OutputPin> Sram<SPI, CS> {
    /// Creates a new 23-series SRAM driver.
    ///
    /// The driver starts out [`Mode::Uninitialized`]; call
    /// [`Sram::configure`] before reading or writing.
    ///
    /// # Parameters
    ///
    /// * **`spi`**: An SPI master. Must be configured according to
    ///   [`BUS_SETTINGS`].
    /// * **`cs`**: The **C**hip-**S**elect Pin connected to the `\CS` pin
    ///   of the SRAM chip. Will be driven low when accessing the device.
    /// * **`kilobits`**: Device capacity in kilobits, eg. 1024 for a
    ///   23LC1024.
    pub fn new(spi: SPI, cs: CS, kilobits: u32) -> Self {
        Self {
            spi,
            cs,
            capacity: kilobits.saturating_mul(128),
            mode: Mode::Uninitialized,
            page_length: 0,
            last_error: LastError::Ok,
            diagnostics: NoDiagnostics,
        }
    }

    /// Creates a driver, deselects the chip and configures `mode`.
    pub fn init(
        spi: SPI,
        cs: CS,
        kilobits: u32,
        mode: Mode,
        page_length: usize,
    ) -> Result<Self, Error<SPI, CS>> {
        let mut this = Self::new(spi, cs, kilobits);
        this.cs.set_high().map_err(Error::Gpio)?;
        this.configure(mode, page_length)?;
        info!(
            "Sram::init: {} bytes, mode = {:?}, page length = {}",
            this.capacity, this.mode, this.page_length
        );
        Ok(this)
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin, D: Diagnostics> Sram<SPI, CS, D> {
    /// Replaces the diagnostics sink.
    pub fn with_diagnostics<D2: Diagnostics>(self, diagnostics: D2) -> Sram<SPI, CS, D2> {
        Sram {
            spi: self.spi,
            cs: self.cs,
            capacity: self.capacity,
            mode: self.mode,
            page_length: self.page_length,
            last_error: self.last_error,
            diagnostics,
        }
    }

    /// Device capacity in bytes.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The currently configured addressing mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Maximum transfer size in page mode. Always 0 in byte mode.
    pub fn page_length(&self) -> usize {
        self.page_length
    }

    /// Outcome of the most recent fallible operation.
    pub fn last_error(&self) -> LastError {
        self.last_error
    }

    /// Sets the addressing mode of driver and device.
    ///
    /// * [`Mode::Byte`] always succeeds and forces the page length to 0.
    /// * [`Mode::Page`] fails with [`Error::BadPage`] if `page_length` is
    ///   larger than [`MAX_PAGE_LENGTH`].
    /// * [`Mode::Sequential`] keeps `page_length` as given; sequential
    ///   transfers are bounded by the buffer only.
    /// * [`Mode::Uninitialized`] fails with [`Error::BadOption`].
    ///
    /// On failure the previous mode and page length are kept.
    pub fn configure(&mut self, mode: Mode, page_length: usize) -> Result<(), Error<SPI, CS>> {
        let result = self.write_mode(mode, page_length);
        self.record(result, format_args!("configure {:?}/{}", mode, page_length))
    }

    fn write_mode(&mut self, mode: Mode, page_length: usize) -> Result<(), Error<SPI, CS>> {
        let page_length = match mode {
            Mode::Byte => 0,
            Mode::Page if page_length > MAX_PAGE_LENGTH => return Err(Error::BadPage),
            _ => page_length,
        };
        let register = mode.register().ok_or(Error::BadOption)?;

        let mut cmd_buf = [Opcode::WriteMode as u8, register.bits()];
        self.transaction(|spi| Self::transfer(spi, &mut cmd_buf))?;

        self.mode = mode;
        self.page_length = page_length;
        debug!("mode = {:?}, page length = {}", mode, page_length);
        Ok(())
    }

    /// Reads the mode register back from the device.
    ///
    /// The reserved register value decodes as [`Mode::Uninitialized`].
    pub fn read_mode_register(&mut self) -> Result<Mode, Error<SPI, CS>> {
        let mut buf = [Opcode::ReadMode as u8, FILLER];
        let result = self.transaction(|spi| Self::transfer(spi, &mut buf));
        let result = result.map(|()| Mode::from_register(ModeRegister::from_bits_truncate(buf[1])));
        self.record(result, format_args!("read mode register"))
    }

    /// Returns the device to plain SPI access if it was left in SDI or SQI
    /// mode.
    pub fn reset_io(&mut self) -> Result<(), Error<SPI, CS>> {
        let mut cmd_buf = [Opcode::ResetIo as u8];
        let result = self.transaction(|spi| Self::transfer(spi, &mut cmd_buf));
        self.record(result, format_args!("reset I/O"))
    }

    /// Reads the byte at `addr`.
    pub fn read_byte(&mut self, addr: u32) -> Result<u8, Error<SPI, CS>> {
        let mut buf = [0];
        Read::read(self, addr, &mut buf)?;
        Ok(buf[0])
    }

    /// Writes `byte` to `addr`.
    pub fn write_byte(&mut self, addr: u32, byte: u8) -> Result<(), Error<SPI, CS>> {
        Write::write(self, addr, &[byte])?;
        Ok(())
    }

    /// Releases the SPI master and the CS pin.
    ///
    /// CS is already deasserted after every operation, so the pin can be
    /// reconfigured (eg. as an input) right away.
    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Stores the outcome of an operation in `last_error` and reports
    /// failures.
    fn record<T>(
        &mut self,
        result: Result<T, Error<SPI, CS>>,
        context: fmt::Arguments<'_>,
    ) -> Result<T, Error<SPI, CS>> {
        match &result {
            Ok(_) => self.last_error = LastError::Ok,
            Err(e) => {
                self.last_error = e.kind();
                self.diagnostics
                    .report(format_args!("{}: {}", context, self.last_error));
            }
        }
        result
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T, Error<SPI, CS>>
    where
        F: FnOnce(&mut SPI) -> Result<T, Error<SPI, CS>>,
    {
        // If the command fails, make sure to disable CS anyways
        self.cs.set_low().map_err(Error::Gpio)?;
        let result = f(&mut self.spi);
        self.cs.set_high().map_err(Error::Gpio)?;
        result
    }

    fn transfer(spi: &mut SPI, bytes: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        spi.transfer(bytes).map(|_| ()).map_err(Error::Spi)
    }

    fn send_command(
        spi: &mut SPI,
        capacity: u32,
        opcode: Opcode,
        addr: u32,
    ) -> Result<(), Error<SPI, CS>> {
        if addr > capacity || addr > ADDRESS_MASK {
            return Err(Error::BadAddress);
        }
        trace!("{:?} at {:#08x}", opcode, addr);

        let mut cmd_buf = [
            opcode as u8,
            (addr >> 16) as u8,
            (addr >> 8) as u8,
            addr as u8,
        ];
        Self::transfer(spi, &mut cmd_buf)
    }

    fn send_payload(spi: &mut SPI, data: &[u8]) -> Result<(), Error<SPI, CS>> {
        let mut chunk_buf = [0; CHUNK_LEN];
        for chunk in data.chunks(CHUNK_LEN) {
            let buf = &mut chunk_buf[..chunk.len()];
            buf.copy_from_slice(chunk);
            Self::transfer(spi, buf)?;
        }
        Ok(())
    }

    /// Reads into `buf` through a stack buffer, so a failed transfer leaves
    /// the rest of `buf` untouched.
    fn receive_payload(spi: &mut SPI, buf: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        let mut chunk_buf = [FILLER; CHUNK_LEN];
        for chunk in buf.chunks_mut(CHUNK_LEN) {
            let scratch = &mut chunk_buf[..chunk.len()];
            for byte in scratch.iter_mut() {
                *byte = FILLER;
            }
            let received = spi.transfer(scratch).map_err(Error::Spi)?;
            chunk.copy_from_slice(received);
        }
        Ok(())
    }

    /// Runs one command: header, then `payload`, framed by CS.
    ///
    /// An out of range address still opens and closes a transaction, but
    /// nothing is transferred.
    fn send_framed_payload<F>(
        &mut self,
        opcode: Opcode,
        addr: u32,
        payload: F,
    ) -> Result<(), Error<SPI, CS>>
    where
        F: FnOnce(&mut SPI) -> Result<(), Error<SPI, CS>>,
    {
        let capacity = self.capacity;
        self.transaction(|spi| {
            Self::send_command(spi, capacity, opcode, addr)?;
            payload(spi)
        })
    }

    /// Byte mode: one command per byte, at consecutive addresses.
    ///
    /// Stops at the first byte that fails, either on an out of range
    /// address or on a bus error. Bytes already transferred stay
    /// transferred: once at least one went out the partial count is
    /// returned, and `last_error` tells why the rest was not.
    fn transfer_bytewise<F>(
        &mut self,
        opcode: Opcode,
        addr: u32,
        len: usize,
        mut payload: F,
    ) -> Result<usize, Error<SPI, CS>>
    where
        F: FnMut(&mut SPI, usize) -> Result<(), Error<SPI, CS>>,
    {
        if len == 0 {
            return self.record(Err(Error::BadSize), format_args!("{:?} of 0 bytes", opcode));
        }

        let mut done = 0;
        for i in 0..len {
            let current = addr.saturating_add(i as u32);
            let result = self.send_framed_payload(opcode, current, |spi| payload(spi, i));
            match self.record(result, format_args!("{:?} at {:#08x}", opcode, current)) {
                Ok(()) => done += 1,
                Err(_) if done > 0 => break,
                Err(e) => return Err(e),
            }
        }
        Ok(done)
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin, D: Diagnostics> Read<u32, SPI, CS> for Sram<SPI, CS, D> {
    /// Reads SRAM contents into `buf`, starting at `addr`.
    ///
    /// In byte mode each byte is read with its own command. In page mode
    /// `buf` must not be longer than the page length. Page and sequential
    /// reads use a single command.
    ///
    /// # Parameters
    ///
    /// * `addr`: 24-bit address to start reading at.
    /// * `buf`: Destination buffer to fill.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize, Error<SPI, CS>> {
        let len = buf.len();
        let result = match self.mode {
            Mode::Byte => {
                return self.transfer_bytewise(Opcode::Read, addr, len, |spi, i| {
                    Self::receive_payload(spi, &mut buf[i..=i])
                })
            }
            Mode::Page if len > self.page_length => Err(Error::BadSize),
            Mode::Page | Mode::Sequential if len == 0 => Err(Error::BadSize),
            Mode::Page | Mode::Sequential => {
                self.send_framed_payload(Opcode::Read, addr, |spi| Self::receive_payload(spi, buf))
            }
            Mode::Uninitialized => Err(Error::Uninitialized),
        };
        self.record(result, format_args!("read {} bytes at {:#08x}", len, addr))?;
        trace!("read {:#08x}: {:?}", addr, HexSlice(&*buf));
        Ok(len)
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin, D: Diagnostics> Write<u32, SPI, CS> for Sram<SPI, CS, D> {
    /// Writes `data` to the SRAM, starting at `addr`.
    ///
    /// Follows the same per-mode rules as [`Read::read`].
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<usize, Error<SPI, CS>> {
        let len = data.len();
        let result = match self.mode {
            Mode::Byte => {
                return self.transfer_bytewise(Opcode::Write, addr, len, |spi, i| {
                    Self::send_payload(spi, &data[i..=i])
                })
            }
            Mode::Page if len > self.page_length => Err(Error::BadSize),
            Mode::Page | Mode::Sequential if len == 0 => Err(Error::BadSize),
            Mode::Page | Mode::Sequential => {
                trace!("write {:#08x}: {:?}", addr, HexSlice(data));
                self.send_framed_payload(Opcode::Write, addr, |spi| Self::send_payload(spi, data))
            }
            Mode::Uninitialized => Err(Error::Uninitialized),
        };
        self.record(result, format_args!("write {} bytes at {:#08x}", len, addr))?;
        Ok(len)
    }
}
