//! Physical values decoded from the two frame buffers, and the telegram sent
//! over BLE.
//!
//! Frame layout (three big-endian `u16` per frame):
//!
//! | frame      | field 1      | field 2         | field 3 |
//! |------------|--------------|-----------------|---------|
//! | engine     | IAT          | RPM             | MAP + 100 |
//! | electrical | AFR × 10     | battery V × 100 | EGT     |
//!
//! Decimal values are carried in fixed point (tenths) to the text output. VOLT
//! is converted from hundredths through an `f64` product so its last digit
//! matches what existing receivers print.

use core::fmt::{self, Write as _};

use heapless::String;

use crate::can::store::{FrameSlot, FrameStore};

/// Capacity of one telegram line. The widest possible line
/// (`65535,65435,6553.5,65535,655.4,65535\n`) is 37 bytes.
pub const TELEGRAM_LEN: usize = 48;

/// Capacity of one gauge label's text.
pub const GAUGE_TEXT_LEN: usize = 12;

/// One `RPM,MAP,AFR,IAT,VOLT,EGT\n` line.
pub type Telegram = String<TELEGRAM_LEN>;

/// MAP is transmitted with a +100 offset.
const MAP_OFFSET: i32 = 100;

// =============================================================================
// Fixed-point Formatting
// =============================================================================

/// Write `tenths / 10` with exactly one decimal (`150` → `15.0`, `-5` → `-0.5`).
pub fn write_tenths<W: fmt::Write>(
    out: &mut W,
    tenths: i32,
) -> fmt::Result {
    let sign = if tenths < 0 { "-" } else { "" };
    let abs = tenths.unsigned_abs();
    write!(out, "{sign}{}.{}", abs / 10, abs % 10)
}

/// Hundredths to tenths, rounded the way the receiving tools print
/// `raw * 0.01` to one decimal.
///
/// The product is taken in `f64` and rounded by the float formatter, so a
/// raw value whose product lands just under a half rounds down (`1225` gives
/// `122`, not `123`). Integer half-up rounding disagrees on about 3% of
/// inputs.
pub fn centi_to_tenths(centi: u16) -> u16 {
    let volts = f64::from(centi) * 0.01;
    let mut text: String<8> = String::new();
    // Widest is "655.4"
    let _ = write!(text, "{volts:.1}");
    text.bytes()
        .filter(u8::is_ascii_digit)
        .fold(0, |acc, d| acc * 10 + u16::from(d - b'0'))
}

/// A decoded value, either whole or with one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    Whole(i32),
    Tenths(i32),
}

impl fmt::Display for Reading {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match *self {
            Self::Whole(v) => write!(f, "{v}"),
            Self::Tenths(t) => write_tenths(f, t),
        }
    }
}

// =============================================================================
// Gauges
// =============================================================================

/// The six values shown on the display and sent in the telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gauge {
    /// Intake air temperature.
    Iat,
    Rpm,
    /// Manifold absolute pressure.
    Map,
    /// Air/fuel ratio.
    Afr,
    /// Battery voltage.
    Volt,
    /// Exhaust gas temperature.
    Egt,
}

impl Gauge {
    pub const ALL: [Self; 6] = [Self::Iat, Self::Rpm, Self::Map, Self::Afr, Self::Volt, Self::Egt];

    /// Buffer and 1-based field index the value is decoded from.
    pub const fn source(self) -> (FrameSlot, usize) {
        match self {
            Self::Iat => (FrameSlot::Engine, 1),
            Self::Rpm => (FrameSlot::Engine, 2),
            Self::Map => (FrameSlot::Engine, 3),
            Self::Afr => (FrameSlot::Electrical, 1),
            Self::Volt => (FrameSlot::Electrical, 2),
            Self::Egt => (FrameSlot::Electrical, 3),
        }
    }

    /// Caption printed next to the value.
    pub const fn caption(self) -> &'static str {
        match self {
            Self::Iat => "IAT",
            Self::Rpm => "RPM",
            Self::Map => "MAP",
            Self::Afr => "AFR",
            Self::Volt => "VOLT",
            Self::Egt => "EGT",
        }
    }

    /// Unit appended to the displayed value.
    pub const fn unit_suffix(self) -> &'static str {
        match self {
            Self::Volt => "V",
            _ => "",
        }
    }

    /// Decode this gauge from the current buffers.
    pub fn read(
        self,
        store: &FrameStore,
    ) -> Reading {
        let (slot, index) = self.source();
        let raw = store.field16(slot, index);
        match self {
            Self::Iat | Self::Rpm | Self::Egt => Reading::Whole(i32::from(raw)),
            Self::Map => Reading::Whole(i32::from(raw) - MAP_OFFSET),
            Self::Afr => Reading::Tenths(i32::from(raw)),
            Self::Volt => Reading::Tenths(i32::from(centi_to_tenths(raw))),
        }
    }

    /// Label text: reading plus unit (`"90.0V"`).
    pub fn display_text(
        self,
        store: &FrameStore,
    ) -> String<GAUGE_TEXT_LEN> {
        let mut text = String::new();
        // Widest reading is "655.4V", well under GAUGE_TEXT_LEN
        write!(text, "{}{}", self.read(store), self.unit_suffix()).ok();
        text
    }
}

// =============================================================================
// Telegram
// =============================================================================

/// All six values decoded at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySample {
    pub iat: i32,
    pub rpm: i32,
    pub map: i32,
    pub afr_tenths: i32,
    pub volt_tenths: i32,
    pub egt: i32,
}

impl TelemetrySample {
    pub fn decode(store: &FrameStore) -> Self {
        let whole = |gauge: Gauge| match gauge.read(store) {
            Reading::Whole(v) | Reading::Tenths(v) => v,
        };
        Self {
            iat: whole(Gauge::Iat),
            rpm: whole(Gauge::Rpm),
            map: whole(Gauge::Map),
            afr_tenths: whole(Gauge::Afr),
            volt_tenths: whole(Gauge::Volt),
            egt: whole(Gauge::Egt),
        }
    }

    /// `RPM,MAP,AFR,IAT,VOLT,EGT\n` with AFR and VOLT to one decimal.
    pub fn encode(&self) -> Telegram {
        let mut line = Telegram::new();
        // Bounded by TELEGRAM_LEN for every u16-derived input
        let _ = self.write_line(&mut line);
        line
    }

    fn write_line<W: fmt::Write>(
        &self,
        out: &mut W,
    ) -> fmt::Result {
        write!(out, "{},{},", self.rpm, self.map)?;
        write_tenths(out, self.afr_tenths)?;
        write!(out, ",{},", self.iat)?;
        write_tenths(out, self.volt_tenths)?;
        writeln!(out, ",{}", self.egt)
    }
}

/// Decode and encode in one step.
pub fn encode_telegram(store: &FrameStore) -> Telegram { TelemetrySample::decode(store).encode() }

// =============================================================================
// Tests
// =============================================================================
