//! Label geometry for the 320x240 panel.
//!
//! Every dynamic label owns a fixed window; redrawing a label clears and
//! repaints exactly that window, so label windows must not overlap each other
//! or the static captions.
//!
//! ```text
//!  ┌──────────────────────────────────────────────┐
//!  │              [ link status ]                 │
//!  │ [ IAT value ]  IAT      [ AFR ]  AFR          │
//!  │ [ RPM ]     RPM        [ VOLT ]  VOLT        │
//!  │ [ MAP ]  MAP           [ EGT ]  EGT          │
//!  │ v0.1.0  [ radio status footer ]              │
//!  └──────────────────────────────────────────────┘
//! ```

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;

use crate::colors;
use crate::display::LabelId;
use crate::styles::{LARGE_FONT, SMALL_FONT};
use crate::telemetry::Gauge;

// =============================================================================
// Display Configuration
// =============================================================================

/// Display width in pixels.
pub const SCREEN_WIDTH: u32 = 320;

/// Display height in pixels.
pub const SCREEN_HEIGHT: u32 = 240;

/// Height of a large-font label window.
const LARGE_HEIGHT: u32 = 24;

/// Height of a small-font label window.
const SMALL_HEIGHT: u32 = 18;

/// Largest label window in pixels, sizing the render scratch buffer.
pub const MAX_LABEL_PIXELS: usize = 250 * SMALL_HEIGHT as usize;

// =============================================================================
// Label Windows
// =============================================================================

/// Screen window of a dynamic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl LabelRect {
    const fn new(
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn pixels(&self) -> usize { (self.width * self.height) as usize }

    pub fn rectangle(&self) -> Rectangle { Rectangle::new(Point::new(self.x, self.y), Size::new(self.width, self.height)) }

    /// Whether the two windows share any pixel.
    pub const fn overlaps(
        &self,
        other: &Self,
    ) -> bool {
        self.x < other.x + other.width as i32
            && other.x < self.x + self.width as i32
            && self.y < other.y + other.height as i32
            && other.y < self.y + self.height as i32
    }
}

/// Window of each dynamic label. Value windows end before their caption.
pub const fn label_rect(id: LabelId) -> LabelRect {
    match id {
        LabelId::LinkStatus => LabelRect::new(95, 7, 130, LARGE_HEIGHT),
        LabelId::RadioStatus => LabelRect::new(65, 220, 250, SMALL_HEIGHT),
        LabelId::Gauge(Gauge::Iat) => LabelRect::new(12, 57, 110, LARGE_HEIGHT),
        LabelId::Gauge(Gauge::Rpm) => LabelRect::new(12, 118, 88, LARGE_HEIGHT),
        LabelId::Gauge(Gauge::Map) => LabelRect::new(12, 180, 72, LARGE_HEIGHT),
        LabelId::Gauge(Gauge::Afr) => LabelRect::new(176, 57, 74, LARGE_HEIGHT),
        LabelId::Gauge(Gauge::Volt) => LabelRect::new(170, 118, 76, LARGE_HEIGHT),
        LabelId::Gauge(Gauge::Egt) => LabelRect::new(170, 180, 72, LARGE_HEIGHT),
    }
}

/// Font of each dynamic label.
pub const fn label_font(id: LabelId) -> &'static MonoFont<'static> {
    match id {
        LabelId::RadioStatus => SMALL_FONT,
        LabelId::LinkStatus | LabelId::Gauge(_) => LARGE_FONT,
    }
}

// =============================================================================
// Static Captions
// =============================================================================

/// Text drawn once at boot and never updated.
#[derive(Debug, Clone, Copy)]
pub struct Caption {
    pub text: &'static str,
    pub origin: Point,
    pub font: &'static MonoFont<'static>,
    pub color: Rgb565,
}

impl Caption {
    /// Caption bounding box for its text and font.
    pub fn rect(&self) -> LabelRect {
        let size = self.font.character_size;
        let width = size.width * self.text.len() as u32;
        LabelRect::new(self.origin.x, self.origin.y, width, size.height)
    }
}

const fn gauge_caption(
    gauge: Gauge,
    x: i32,
    y: i32,
    font: &'static MonoFont<'static>,
) -> Caption {
    Caption {
        text: gauge.caption(),
        origin: Point::new(x, y),
        font,
        color: colors::caption_color(gauge),
    }
}

/// Gauge captions beside their value windows.
pub const GAUGE_CAPTIONS: [Caption; 6] = [
    gauge_caption(Gauge::Iat, 125, 66, LARGE_FONT),
    gauge_caption(Gauge::Rpm, 103, 107, SMALL_FONT),
    gauge_caption(Gauge::Map, 87, 189, LARGE_FONT),
    gauge_caption(Gauge::Afr, 253, 68, SMALL_FONT),
    gauge_caption(Gauge::Volt, 248, 126, LARGE_FONT),
    gauge_caption(Gauge::Egt, 245, 189, LARGE_FONT),
];

/// Firmware version in the bottom-left corner.
pub const VERSION_CAPTION: Caption = Caption {
    text: concat!("v", env!("CARGO_PKG_VERSION")),
    origin: Point::new(5, 220),
    font: SMALL_FONT,
    color: colors::VERSION,
};

// =============================================================================
// Tests
// =============================================================================
