//! Crate-internal logging macros.
//!
//! With the `defmt` feature enabled these forward to the matching `defmt` macro,
//! so the firmware gets RTT output from the core without the core knowing about
//! the transport. Without it they compile to nothing (arguments are still
//! borrowed so call sites don't trigger unused-variable warnings), which keeps
//! host tests free of a global logger.
#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::error!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

/// Collaborator errors are only `Debug`; with defmt they log through
/// `Debug2Format`.
#[cfg(feature = "defmt")]
pub(crate) fn dbg_fmt<E: core::fmt::Debug>(e: &E) -> defmt::Debug2Format<'_, E> { defmt::Debug2Format(e) }

#[cfg(not(feature = "defmt"))]
pub(crate) fn dbg_fmt<E: core::fmt::Debug>(e: &E) -> &E { e }
