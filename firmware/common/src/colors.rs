//! Color constants for the bridge display.
//!
//! Values are the panel's 24-bit design colours reduced to RGB565
//! (5 bits red, 6 bits green, 5 bits blue), which the ST7789 takes natively.
//! Where a design colour coincides with an `RgbColor` constant, the constant
//! is used.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

use crate::display::LabelId;
use crate::telemetry::Gauge;

// =============================================================================
// Background and Status
// =============================================================================

/// Near-black screen background (`#121212`).
pub const BACKGROUND: Rgb565 = Rgb565::new(2, 4, 2);

/// Grey for `INIT...` and `OFF` (`#999999`).
pub const STATUS_IDLE: Rgb565 = Rgb565::new(19, 38, 19);

/// Bright green for `ONLINE` (`#33FF33`).
pub const STATUS_ONLINE: Rgb565 = Rgb565::new(6, 63, 6);

/// Radio footer when BLE is up.
pub const RADIO_OK: Rgb565 = Rgb565::GREEN;

/// Any error text (`CAN Err`, `BLE Missing`, `BLE Err: …`).
pub const ERROR: Rgb565 = Rgb565::RED;

/// Firmware version caption (`#AAAAAA`).
pub const VERSION: Rgb565 = Rgb565::new(21, 42, 21);

// =============================================================================
// Gauge Values
// =============================================================================

/// Cyan (`#07F5EE`).
pub const IAT_VALUE: Rgb565 = Rgb565::new(0, 61, 29);

/// Off-white (`#F9F9F9`).
pub const RPM_VALUE: Rgb565 = Rgb565::new(31, 62, 31);

/// Green (`#2BF507`).
pub const MAP_VALUE: Rgb565 = Rgb565::new(5, 61, 0);

/// Magenta (`#EA07F5`).
pub const AFR_VALUE: Rgb565 = Rgb565::new(29, 1, 30);

/// Amber (`#F5C807`).
pub const VOLT_VALUE: Rgb565 = Rgb565::new(30, 50, 0);

/// Red-orange (`#F51907`).
pub const EGT_VALUE: Rgb565 = Rgb565::new(30, 6, 0);

// =============================================================================
// Gauge Captions
// =============================================================================

pub const IAT_CAPTION: Rgb565 = Rgb565::new(1, 63, 30);
pub const RPM_CAPTION: Rgb565 = Rgb565::new(30, 60, 30);
pub const MAP_CAPTION: Rgb565 = Rgb565::new(1, 60, 1);
pub const AFR_CAPTION: Rgb565 = Rgb565::new(29, 2, 31);
pub const VOLT_CAPTION: Rgb565 = Rgb565::new(31, 52, 0);
pub const EGT_CAPTION: Rgb565 = Rgb565::new(31, 1, 0);

// =============================================================================
// Lookups
// =============================================================================

/// Value colour of a gauge.
pub const fn value_color(gauge: Gauge) -> Rgb565 {
    match gauge {
        Gauge::Iat => IAT_VALUE,
        Gauge::Rpm => RPM_VALUE,
        Gauge::Map => MAP_VALUE,
        Gauge::Afr => AFR_VALUE,
        Gauge::Volt => VOLT_VALUE,
        Gauge::Egt => EGT_VALUE,
    }
}

/// Caption colour of a gauge.
pub const fn caption_color(gauge: Gauge) -> Rgb565 {
    match gauge {
        Gauge::Iat => IAT_CAPTION,
        Gauge::Rpm => RPM_CAPTION,
        Gauge::Map => MAP_CAPTION,
        Gauge::Afr => AFR_CAPTION,
        Gauge::Volt => VOLT_CAPTION,
        Gauge::Egt => EGT_CAPTION,
    }
}

/// Colour a label has before the bridge first writes it.
pub const fn initial_color(label: LabelId) -> Rgb565 {
    match label {
        LabelId::LinkStatus => STATUS_IDLE,
        LabelId::RadioStatus => VERSION,
        LabelId::Gauge(gauge) => value_color(gauge),
    }
}
