use core::fmt::{self, Debug, Display};
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

mod private {
    #[derive(Debug)]
    pub enum Private {}
}

/// The error type used by this library.
///
/// This can encapsulate an SPI or GPIO error, and adds its own protocol errors
/// on top of that.
pub enum Error<SPI: Transfer<u8>, GPIO: OutputPin> {
    /// An SPI transfer failed.
    Spi(SPI::Error),

    /// A GPIO could not be set.
    Gpio(GPIO::Error),

    /// The transfer size does not fit the current mode.
    ///
    /// Returned for empty transfers and for page mode transfers longer than
    /// the configured page length.
    BadSize,

    /// The requested page length exceeds the 32 byte device page.
    BadPage,

    /// The address lies beyond the capacity of the device.
    BadAddress,

    /// The requested mode cannot be configured.
    BadOption,

    /// The driver was used before a mode was configured.
    Uninitialized,

    #[doc(hidden)]
    __NonExhaustive(private::Private),
}

impl<SPI: Transfer<u8>, GPIO: OutputPin> Error<SPI, GPIO> {
    /// Returns the kind of this error, as recorded by the driver.
    pub fn kind(&self) -> LastError {
        match self {
            Error::BadSize => LastError::BadSize,
            Error::BadPage => LastError::BadPage,
            Error::BadAddress => LastError::BadAddress,
            Error::BadOption => LastError::BadOption,
            Error::Spi(_) | Error::Gpio(_) | Error::Uninitialized => LastError::Generic,
            Error::__NonExhaustive(_) => unreachable!(),
        }
    }
}

impl<SPI: Transfer<u8>, GPIO: OutputPin> Debug for Error<SPI, GPIO>
where
    SPI::Error: Debug,
    GPIO::Error: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "Error::Spi({:?})", spi),
            Error::Gpio(gpio) => write!(f, "Error::Gpio({:?})", gpio),
            Error::BadSize => f.write_str("Error::BadSize"),
            Error::BadPage => f.write_str("Error::BadPage"),
            Error::BadAddress => f.write_str("Error::BadAddress"),
            Error::BadOption => f.write_str("Error::BadOption"),
            Error::Uninitialized => f.write_str("Error::Uninitialized"),
            Error::__NonExhaustive(_) => unreachable!(),
        }
    }
}

impl<SPI: Transfer<u8>, GPIO: OutputPin> Display for Error<SPI, GPIO>
where
    SPI::Error: Display,
    GPIO::Error: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "SPI error: {}", spi),
            Error::Gpio(gpio) => write!(f, "GPIO error: {}", gpio),
            Error::Uninitialized => f.write_str("no operating mode has been configured"),
            other => Display::fmt(&other.kind(), f),
        }
    }
}

/// Outcome of the most recent fallible operation on a driver.
///
/// Latest wins: every operation that can fail overwrites it, including with
/// [`LastError::Ok`] on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastError {
    /// The operation succeeded.
    Ok,
    /// Transfer size incompatible with the current mode or page length.
    BadSize,
    /// Page length larger than the device page.
    BadPage,
    /// Address beyond the device capacity.
    BadAddress,
    /// Unrecognized mode.
    BadOption,
    /// Not configured yet, or a bus/pin failure.
    Generic,
}

impl Default for LastError {
    fn default() -> Self {
        LastError::Ok
    }
}

impl Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LastError::Ok => "no error",
            LastError::BadSize => "transfer size does not fit the current mode",
            LastError::BadPage => "page length exceeds the device page",
            LastError::BadAddress => "address beyond device capacity",
            LastError::BadOption => "unsupported operating mode",
            LastError::Generic => "operation failed",
        })
    }
}
