//! Board-agnostic core of the CAN to BLE telemetry bridge.
//!
//! Everything that does not touch a peripheral lives here and is shared
//! between the Pico 2 W firmware and the host simulator:
//!
//! - [`can`]: frames, the tracked-frame store, the SLCAN codec and the
//!   [`CanPeripheral`](can::CanPeripheral) interface
//! - [`connectivity`]: online/offline link monitor
//! - [`telemetry`]: gauge decoding and the CSV telegram
//! - [`ble`]: advertising payload, [`BleRadio`](ble::BleRadio) interface and
//!   the UART peripheral
//! - [`display`], [`scheduler`], [`status`]: dashboard labels
//! - [`layout`], [`colors`], [`styles`], [`render`]: how labels look on the
//!   320x240 panel
//! - [`bridge`]: the owned context tying it together, ticked by the platform
//! - [`debug_log`]: recent-event ring buffer
//!
//! # no_std Compatibility
//!
//! The crate is `no_std` and allocation-free. Logging goes through `defmt`
//! when the `defmt` feature is enabled and compiles away otherwise.

#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

#[macro_use]
mod fmt;

pub mod ble;
pub mod bridge;
pub mod can;
pub mod colors;
pub mod config;
pub mod connectivity;
pub mod debug_log;
pub mod display;
pub mod error;
pub mod layout;
pub mod render;
pub mod scheduler;
pub mod status;
pub mod styles;
pub mod telemetry;

#[cfg(test)]
mod mocks;

// Re-export commonly used items
pub use bridge::{Bridge, TickReport};
pub use config::BridgeConfig;
pub use connectivity::LinkState;
pub use display::{Dashboard, LabelBoard, LabelId};
pub use error::BridgeError;
pub use telemetry::Gauge;
