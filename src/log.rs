//! Logging macros that forward to the `log` crate when the `log` feature is
//! enabled, and expand to nothing otherwise.

#![allow(unused_macros)]

#[cfg(feature = "log")]
macro_rules! info {
    ($($t:tt)*) => { ::log::info!($($t)*) };
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => { ::log::debug!($($t)*) };
}

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => { ::log::trace!($($t)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($t:tt)*) => { $crate::log::discard(format_args!($($t)*)) };
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => { $crate::log::discard(format_args!($($t)*)) };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => { $crate::log::discard(format_args!($($t)*)) };
}

#[cfg(not(feature = "log"))]
#[inline(always)]
pub(crate) fn discard(_: core::fmt::Arguments<'_>) {}
