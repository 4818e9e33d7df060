//! Firmware library - the board glue that can be tested on the host.
//!
//! The binary (`main.rs`) wires these to the RP2350 peripherals:
//!
//! - [`slcan_port`]: `CanPeripheral` over a serial SLCAN adapter
//! - [`radio_link`]: `BleRadio` that forwards requests to the BLE task
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test --lib --target x86_64-unknown-linux-gnu
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), allowing use of the standard
//! test framework while the actual firmware runs as `no_std`.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]

pub mod radio_link;
pub mod slcan_port;
