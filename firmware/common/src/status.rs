//! Human-readable status labels.
//!
//! Two labels report health: the link status at the top of the screen
//! (`INIT...`, `OFF`, `ONLINE`, `CAN Err`) and the radio footer (`BLE OK`,
//! `BLE Missing`, `BLE Err: <reason>`).

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::Rgb565;
use heapless::String;

use crate::colors;
use crate::connectivity::LinkState;
use crate::display::{Dashboard, LABEL_TEXT_LEN, LabelId};
use crate::error::BridgeError;

// =============================================================================
// Link Status
// =============================================================================

/// CAN side of the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Before the CAN peripheral has been brought up.
    Init,
    /// CAN up, no recent frames.
    Off,
    /// Tracked frames arriving.
    Online,
    /// CAN peripheral failed to initialize.
    CanError,
}

impl LinkStatus {
    pub const fn text(self) -> &'static str {
        match self {
            Self::Init => "INIT...",
            Self::Off => "OFF",
            Self::Online => "ONLINE",
            Self::CanError => "CAN Err",
        }
    }

    pub const fn color(self) -> Rgb565 {
        match self {
            Self::Init | Self::Off => colors::STATUS_IDLE,
            Self::Online => colors::STATUS_ONLINE,
            Self::CanError => colors::ERROR,
        }
    }
}

impl From<LinkState> for LinkStatus {
    fn from(state: LinkState) -> Self {
        match state {
            LinkState::Offline => Self::Off,
            LinkState::Online => Self::Online,
        }
    }
}

// =============================================================================
// Radio Status
// =============================================================================

/// BLE side of the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioStatus {
    Ok,
    /// No radio on this board.
    Missing,
    Error(BridgeError),
}

impl RadioStatus {
    pub fn text(self) -> String<LABEL_TEXT_LEN> {
        let mut text = String::new();
        // "BLE Err: " plus the longest reason fits LABEL_TEXT_LEN
        let _ = match self {
            Self::Ok => text.push_str("BLE OK").map_err(|_| core::fmt::Error),
            Self::Missing => text.push_str("BLE Missing").map_err(|_| core::fmt::Error),
            Self::Error(err) => write!(text, "BLE Err: {}", err.reason()),
        };
        text
    }

    pub const fn color(self) -> Rgb565 {
        match self {
            Self::Ok => colors::RADIO_OK,
            Self::Missing | Self::Error(_) => colors::ERROR,
        }
    }
}

// =============================================================================
// Display Helpers
// =============================================================================

/// Write the link status label (text and colour).
pub fn show_link<D: Dashboard>(
    display: &mut D,
    status: LinkStatus,
) -> Result<(), D::Error> {
    display.set_text(LabelId::LinkStatus, status.text())?;
    display.set_color(LabelId::LinkStatus, status.color())
}

/// Write the radio footer label (text and colour).
pub fn show_radio<D: Dashboard>(
    display: &mut D,
    status: RadioStatus,
) -> Result<(), D::Error> {
    display.set_text(LabelId::RadioStatus, &status.text())?;
    display.set_color(LabelId::RadioStatus, status.color())
}
