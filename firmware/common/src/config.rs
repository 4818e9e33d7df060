//! Bridge configuration.
//!
//! Everything tunable lives here as a compile-time constant. [`BridgeConfig`]
//! bundles the values the runtime context needs so alternative identifiers or
//! timings can be passed in without touching the core.

use crate::ble::advertising::{MAX_ADV_LEN, uart_payload_len};
use crate::can::frame::CanFilter;
use crate::scheduler::PHASE_COUNT;

// =============================================================================
// CAN
// =============================================================================

/// Engine frame: IAT, RPM, MAP.
pub const ENGINE_FRAME_ID: u32 = 144;

/// Electrical frame: AFR, battery voltage, EGT.
pub const ELECTRICAL_FRAME_ID: u32 = 145;

/// Hardware filter applied at startup. Mask `0x7FE` ignores the lowest
/// identifier bit so 144 and 145 both pass.
pub const CAN_FILTER: CanFilter = CanFilter::new(0x90, 0x7FE);

/// Bus speed.
pub const CAN_BITRATE: u32 = 1_000_000;

// =============================================================================
// Timing (milliseconds)
// =============================================================================

/// Silence after which the link is reported offline.
pub const OFFLINE_TIMEOUT_MS: u64 = 1500;

/// Minimum gap between two telemetry telegrams (5 Hz max).
pub const TELEMETRY_INTERVAL_MS: u64 = 200;

/// Main loop period.
pub const LOOP_PERIOD_MS: u64 = 10;

// =============================================================================
// BLE
// =============================================================================

/// Complete local name in the advertising payload.
pub const DEVICE_NAME: &str = "CANBT";

/// Advertising interval in microseconds.
pub const ADV_INTERVAL_US: u32 = 500_000;

/// Concurrent centrals tracked by the UART bridge.
pub const MAX_CONNECTIONS: usize = 4;

/// Depth of the connect/disconnect event queue between radio and main loop.
pub const BLE_EVENT_QUEUE_DEPTH: usize = 8;

// =============================================================================
// Compile-time Validation
// =============================================================================

const _: () = assert!(CAN_FILTER.accepts(ENGINE_FRAME_ID), "filter must pass the engine frame");
const _: () = assert!(CAN_FILTER.accepts(ELECTRICAL_FRAME_ID), "filter must pass the electrical frame");
const _: () = assert!(ENGINE_FRAME_ID != ELECTRICAL_FRAME_ID, "tracked identifiers must differ");
const _: () = assert!(
    uart_payload_len(DEVICE_NAME.len()) <= MAX_ADV_LEN,
    "device name too long for the advertising payload"
);
const _: () = assert!(
    OFFLINE_TIMEOUT_MS > TELEMETRY_INTERVAL_MS,
    "offline timeout must exceed the telemetry interval"
);
const _: () = assert!(
    LOOP_PERIOD_MS * PHASE_COUNT as u64 <= TELEMETRY_INTERVAL_MS,
    "every display field must refresh at least once per telemetry interval"
);

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Values the bridge context is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    pub engine_id: u32,
    pub electrical_id: u32,
    pub filter: CanFilter,
    pub offline_timeout_ms: u64,
    pub telemetry_interval_ms: u64,
    pub device_name: &'static str,
    pub adv_interval_us: u32,
}

impl BridgeConfig {
    pub const DEFAULT: Self = Self {
        engine_id: ENGINE_FRAME_ID,
        electrical_id: ELECTRICAL_FRAME_ID,
        filter: CAN_FILTER,
        offline_timeout_ms: OFFLINE_TIMEOUT_MS,
        telemetry_interval_ms: TELEMETRY_INTERVAL_MS,
        device_name: DEVICE_NAME,
        adv_interval_us: ADV_INTERVAL_US,
    };
}

impl Default for BridgeConfig {
    fn default() -> Self { Self::DEFAULT }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payload_size() {
        assert_eq!(uart_payload_len(DEVICE_NAME.len()), 28);
    }

    #[test]
    fn test_default_config_matches_constants() {
        let config = BridgeConfig::default();
        assert_eq!(config.engine_id, 144);
        assert_eq!(config.electrical_id, 145);
        assert_eq!(config.filter, CanFilter::new(0x90, 0x7FE));
        assert_eq!(config.offline_timeout_ms, 1500);
        assert_eq!(config.telemetry_interval_ms, 200);
    }
}
