//! Timing of the replayed session.
//!
//! `std::time::Duration` is not available in the `no_std` core, so the
//! wall-clock pacing lives here.

use std::time::Duration;

use canbridge_common::config::LOOP_PERIOD_MS;

/// Wall-clock length of one tick in `--realtime` mode.
pub const TICK_TIME: Duration = Duration::from_millis(LOOP_PERIOD_MS);

/// Simulated session length.
pub const SESSION_MS: u64 = 8_000;

/// ECU frame period while the bus is up.
pub const FRAME_PERIOD_MS: u64 = 20;

/// Bus silent from `.0` until `.1`, long enough for the link to drop.
pub const DROPOUT_MS: (u64, u64) = (4_000, 6_000);

/// ECU starts talking.
pub const BUS_START_MS: u64 = 500;
