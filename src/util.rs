use log::{error, info};

use structopt::StructOpt;

pub use linux_embedded_hal::sysfs_gpio::{Direction, Error as PinError};
pub use linux_embedded_hal::{spidev, spidev::SpiModeFlags, Pin as Pindev, Spidev};

use embedded_hal::spi::{Phase, Polarity};
use simplelog::{LevelFilter, TermLogger, TerminalMode};

use ihex::{Reader, Record};

use spi_sram::diagnostics::LogDiagnostics;
use spi_sram::series23::{Mode, Sram, BUS_SETTINGS};
use spi_sram::{Read, Write};

#[derive(Debug, PartialEq, StructOpt)]
struct Options {
    #[structopt(subcommand)]
    operation: Operations,

    /// SPI device
    #[structopt(long, default_value = "/dev/spidev0.0", env = "SPI_DEV")]
    spi_dev: String,

    /// SPI baud rate
    #[structopt(long, env = "SPI_BAUD")]
    spi_baud: Option<u32>,

    /// Chip Select (output) pin
    #[structopt(long, default_value = "8", env = "CS_PIN")]
    cs_pin: u64,

    /// Device capacity in kilobits
    #[structopt(long, default_value = "1024", env = "SRAM_KILOBITS")]
    kilobits: u32,

    /// Configure log level
    #[structopt(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: LevelFilter,
}

#[derive(Debug, PartialEq, StructOpt)]
pub enum Operations {
    /// Show device capacity and mode register
    Info,
    /// Read data from the device
    Read {
        /// SRAM address for read start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,
        /// Length of read in bytes
        #[structopt()]
        length: u32,
    },
    /// Write data starting at the specified address
    Write {
        /// SRAM address for write start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        // Data to write in hexadecimal
        #[structopt(long)]
        data: HexData,
    },
    /// Fill a range with a single value
    Fill {
        /// SRAM address for fill start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        /// Length of fill in bytes
        #[structopt()]
        length: u32,

        /// Fill value in hex
        #[structopt(long, default_value = "0", parse(try_from_str = parse_hex_byte))]
        value: u8,
    },
    /// Dump SRAM contents into a hex file
    Dump {
        /// SRAM address for read start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        /// Length of read in bytes
        #[structopt()]
        length: u32,

        /// Output ihex file
        #[structopt(long, default_value = "dump.ihex")]
        file: String,
    },
    /// Load SRAM contents from a hex file
    Load {
        /// Input ihex file
        file: String,
    },
}

#[derive(Debug, PartialEq)]
pub struct HexData(Vec<u8>);

impl std::str::FromStr for HexData {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s).map(HexData)
    }
}

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

fn parse_hex_byte(s: &str) -> Result<u8, std::num::ParseIntError> {
    u8::from_str_radix(s.trim_start_matches("0x"), 16)
}

fn spi_mode_flags() -> SpiModeFlags {
    let mode = BUS_SETTINGS.hal_mode();
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => SpiModeFlags::SPI_MODE_0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => SpiModeFlags::SPI_MODE_1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => SpiModeFlags::SPI_MODE_2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => SpiModeFlags::SPI_MODE_3,
    }
}

/// Splits a dump into ihex records, switching the upper address half with
/// extended linear address records. Offsets wrap at the end of the 32 bit
/// address space.
fn dump_records(address: u32, data: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut upper = None;
    for (c, chunk) in data.chunks(32).enumerate() {
        let offset = address.wrapping_add((c * 32) as u32);
        if upper != Some(offset >> 16) {
            upper = Some(offset >> 16);
            records.push(Record::ExtendedLinearAddress((offset >> 16) as u16));
        }
        records.push(Record::Data {
            offset: offset as u16,
            value: chunk.to_vec(),
        });
    }
    records.push(Record::EndOfFile);
    records
}

fn main() -> Result<(), Box<dyn std::error::Error + 'static>> {
    // Load options
    let opts = Options::from_args();

    // Setup logging
    TermLogger::init(opts.log_level, simplelog::Config::default(), TerminalMode::Mixed)
        .map_err(|e| format!("logger setup failed: {:?}", e))?;

    // Connect and configure GPIO pin
    let cs_pin = Pindev::new(opts.cs_pin);

    cs_pin.export()?;
    cs_pin.set_direction(Direction::Out)?;

    // Connect and configure SPI device
    let mut spi = Spidev::open(&opts.spi_dev)?;

    let mut spi_config = spidev::SpidevOptions::new();
    spi_config.mode(spi_mode_flags() | SpiModeFlags::SPI_NO_CS);
    spi_config.max_speed_hz(opts.spi_baud.unwrap_or(BUS_SETTINGS.clock_hz));
    spi.configure(&spi_config)?;

    // Instantiate SPI SRAM
    info!("Opening a {} kbit SRAM on {}", opts.kilobits, opts.spi_dev);
    let sram = match Sram::init(spi, cs_pin, opts.kilobits, Mode::Sequential, 0) {
        Ok(s) => s,
        Err(e) => {
            error!("Error initialising SRAM: {:?}", e);
            return Ok(());
        }
    };
    let mut sram = sram.with_diagnostics(LogDiagnostics);

    // Read back the mode register to check we are connected
    match sram.read_mode_register() {
        Ok(Mode::Sequential) => {
            info!("SRAM: {} bytes, sequential mode", sram.capacity());
        }
        Ok(mode) => {
            error!("Mode register check failed ({:?})", mode);
            return Ok(());
        }
        Err(e) => {
            error!("Mode register read error: {:?}", e);
            return Ok(());
        }
    };

    // Perform the requested operation
    match &opts.operation {
        Operations::Info => (),
        Operations::Read { address, length } => {
            info!("Reading {} bytes from address 0x{:06x}", length, address);

            let mut buff = vec![0u8; *length as usize];
            if let Err(e) = sram.read(*address, &mut buff) {
                error!("Read failed: {:?}", e);
                return Ok(());
            }

            info!("Read: {:02x?}", buff);
        }
        Operations::Write { address, data } => {
            info!("Writing {} bytes to address 0x{:06x}", data.0.len(), address);

            if let Err(e) = sram.write(*address, &data.0) {
                error!("Write failed: {:?}", e);
                return Ok(());
            }

            info!("Write complete");
        }
        Operations::Fill {
            address,
            length,
            value,
        } => {
            info!(
                "Filling {} bytes from address 0x{:06x} with 0x{:02x}",
                length, address, value
            );

            let buff = vec![*value; *length as usize];
            if let Err(e) = sram.write(*address, &buff) {
                error!("Fill failed: {:?}", e);
                return Ok(());
            }

            info!("Fill complete");
        }
        Operations::Dump {
            address,
            length,
            file,
        } => {
            info!(
                "Reading {} bytes from address 0x{:06x} to file {}",
                length, address, &file
            );

            let mut buff = vec![0u8; *length as usize];
            if let Err(e) = sram.read(*address, &mut buff) {
                error!("Read failed: {:?}", e);
                return Ok(());
            }

            let records = dump_records(*address, &buff);
            let data = ihex::create_object_file_representation(&records)
                .map_err(|e| format!("ihex encoding failed: {:?}", e))?;

            std::fs::write(file, data)?;

            info!("Dump complete");
        }
        Operations::Load { file } => {
            info!("Loading file {}", file);

            let data = String::from_utf8(std::fs::read(&file)?)?;

            let reader = Reader::new(&data);

            let mut upper = 0u32;
            for record in reader {
                match record {
                    Ok(Record::ExtendedLinearAddress(base)) => upper = u32::from(base) << 16,
                    Ok(Record::Data { offset, value }) => {
                        let address = upper | u32::from(offset);
                        info!("Writing {} bytes at address 0x{:06x}", value.len(), address);
                        if let Err(e) = sram.write(address, &value) {
                            error!("Write failed: {:?}", e);
                            return Ok(());
                        }
                    }
                    Ok(Record::EndOfFile) => (),
                    Err(e) => {
                        error!("Reader error: {:?}", e);
                        return Ok(());
                    }
                    _ => {
                        error!("Unrecognised record: {:?}", record);
                        return Ok(());
                    }
                }
            }

            info!("Load complete");
        }
    }

    let (_spi, cs_pin) = sram.free();
    cs_pin.set_direction(Direction::In)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_switches_upper_address_at_64k() {
        let records = dump_records(0xFFE0, &[0x11; 64]);
        assert_eq!(
            records,
            vec![
                Record::ExtendedLinearAddress(0),
                Record::Data {
                    offset: 0xFFE0,
                    value: vec![0x11; 32],
                },
                Record::ExtendedLinearAddress(1),
                Record::Data {
                    offset: 0,
                    value: vec![0x11; 32],
                },
                Record::EndOfFile,
            ]
        );
    }

    #[test]
    fn dump_wraps_at_end_of_address_space() {
        let records = dump_records(0xFFFF_FFF0, &[0x22; 48]);
        assert_eq!(records.len(), 5);
        assert_eq!(records[2], Record::ExtendedLinearAddress(0));
        assert_eq!(
            records[3],
            Record::Data {
                offset: 0x0010,
                value: vec![0x22; 16],
            }
        );
    }

    #[test]
    fn hex_arguments() {
        assert_eq!(parse_hex("0x1f00"), Ok(0x1f00));
        assert_eq!(parse_hex_byte("ff"), Ok(0xff));
        assert_eq!("0102".parse::<HexData>().unwrap(), HexData(vec![1, 2]));
    }
}
