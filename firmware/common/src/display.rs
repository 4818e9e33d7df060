//! Display collaborator interface and a buffered implementation.
//!
//! The core only ever sets a label's text or colour. [`LabelBoard`] keeps the
//! latest state of every label plus a dirty flag so a platform renderer can
//! redraw just the labels that changed since its last pass.

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb565;
use heapless::String;

use crate::colors;
use crate::telemetry::Gauge;

/// Longest text a label holds; longer text is truncated.
pub const LABEL_TEXT_LEN: usize = 30;

/// Number of labels on the board.
pub const LABEL_COUNT: usize = 8;

// =============================================================================
// Labels
// =============================================================================

/// Every label the bridge writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LabelId {
    /// CAN link status at the top of the screen.
    LinkStatus,
    /// BLE status footer.
    RadioStatus,
    Gauge(Gauge),
}

impl LabelId {
    pub const ALL: [Self; LABEL_COUNT] = [
        Self::LinkStatus,
        Self::RadioStatus,
        Self::Gauge(Gauge::Iat),
        Self::Gauge(Gauge::Rpm),
        Self::Gauge(Gauge::Map),
        Self::Gauge(Gauge::Afr),
        Self::Gauge(Gauge::Volt),
        Self::Gauge(Gauge::Egt),
    ];

    /// Text shown before the bridge first writes the label.
    pub const fn initial_text(self) -> &'static str {
        match self {
            Self::LinkStatus => "INIT...",
            Self::RadioStatus => "",
            Self::Gauge(_) => "---",
        }
    }

    /// Dense index in `0..LABEL_COUNT`, matching [`LabelId::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::LinkStatus => 0,
            Self::RadioStatus => 1,
            Self::Gauge(gauge) => 2 + gauge as usize,
        }
    }
}

// =============================================================================
// Dashboard Trait
// =============================================================================

/// Label rendering primitives the bridge needs from the display.
pub trait Dashboard {
    type Error: Debug;

    fn set_text(
        &mut self,
        label: LabelId,
        text: &str,
    ) -> Result<(), Self::Error>;

    fn set_color(
        &mut self,
        label: LabelId,
        color: Rgb565,
    ) -> Result<(), Self::Error>;
}

// =============================================================================
// Label Board
// =============================================================================

/// Current state of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String<LABEL_TEXT_LEN>,
    pub color: Rgb565,
    pub dirty: bool,
}

/// In-memory [`Dashboard`] tracking which labels need a redraw.
#[derive(Debug, Clone)]
pub struct LabelBoard {
    labels: [Label; LABEL_COUNT],
}

impl LabelBoard {
    /// All labels at their initial text and colour, and dirty.
    pub fn new() -> Self {
        Self {
            labels: LabelId::ALL.map(|id| {
                let mut text = String::new();
                push_truncated(&mut text, id.initial_text());
                Label {
                    text,
                    color: colors::initial_color(id),
                    dirty: true,
                }
            }),
        }
    }

    #[inline]
    pub fn label(
        &self,
        id: LabelId,
    ) -> &Label {
        &self.labels[id.index()]
    }

    #[inline]
    pub fn text(
        &self,
        id: LabelId,
    ) -> &str {
        &self.labels[id.index()].text
    }

    /// Labels changed since they were last marked clean.
    pub fn dirty(&self) -> impl Iterator<Item = LabelId> + '_ {
        LabelId::ALL.into_iter().filter(|id| self.labels[id.index()].dirty)
    }

    pub fn mark_clean(
        &mut self,
        id: LabelId,
    ) {
        self.labels[id.index()].dirty = false;
    }
}

impl Default for LabelBoard {
    fn default() -> Self { Self::new() }
}

impl Dashboard for LabelBoard {
    type Error = Infallible;

    fn set_text(
        &mut self,
        id: LabelId,
        text: &str,
    ) -> Result<(), Self::Error> {
        let label = &mut self.labels[id.index()];
        if label.text.as_str() == text {
            return Ok(());
        }
        label.text.clear();
        push_truncated(&mut label.text, text);
        label.dirty = true;
        Ok(())
    }

    fn set_color(
        &mut self,
        id: LabelId,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        let label = &mut self.labels[id.index()];
        if label.color != color {
            label.color = color;
            label.dirty = true;
        }
        Ok(())
    }
}

fn push_truncated(
    out: &mut String<LABEL_TEXT_LEN>,
    text: &str,
) {
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
