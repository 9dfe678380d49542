//! Error reporting hooks.
//!
//! A driver hands every failed operation to its [`Diagnostics`] sink. The
//! sink is advisory only: nothing it does is fed back into the driver.

use core::fmt;

/// Receives a formatted message whenever a driver operation fails.
pub trait Diagnostics {
    /// Reports a failure.
    fn report(&mut self, message: fmt::Arguments<'_>);
}

/// A sink that drops every report. This is the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    #[inline]
    fn report(&mut self, _: fmt::Arguments<'_>) {}
}

/// A sink that forwards reports to [`log::warn!`].
#[cfg(feature = "log")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

#[cfg(feature = "log")]
impl Diagnostics for LogDiagnostics {
    fn report(&mut self, message: fmt::Arguments<'_>) {
        ::log::warn!("{}", message);
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    fn report(&mut self, message: fmt::Arguments<'_>) {
        (**self).report(message)
    }
}
