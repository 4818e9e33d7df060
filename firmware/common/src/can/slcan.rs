//! SLCAN (Lawicel) ASCII protocol for serial CAN adapters.
//!
//! The RP2350 has no CAN controller, so the firmware talks to a USB/UART CAN
//! adapter in SLCAN mode. Received frames arrive as ASCII records:
//!
//! ```text
//! t090800640BB800FA0000\r      standard id 0x090, 8 bytes
//! T000000912AABB\r              extended id, 8 hex digits
//! ```
//!
//! An optional 4-digit timestamp may follow the data. A bare `\r` acknowledges
//! a command and BEL (0x07) rejects it.

use core::fmt::Write as _;

use heapless::{String, Vec};

use super::frame::{CAN_PAYLOAD_LEN, CanFilter, CanFrame};
use crate::error::SlcanError;

/// Longest valid record: `T` + 8 id + 1 dlc + 16 data + 4 timestamp.
pub const MAX_LINE_LEN: usize = 30;

/// Longest encoded adapter command (`M` + 8 hex + `\r`).
pub const MAX_COMMAND_LEN: usize = 10;

const CR: u8 = b'\r';
const BEL: u8 = 0x07;
const TIMESTAMP_DIGITS: usize = 4;

// =============================================================================
// Decoder
// =============================================================================

/// Byte-at-a-time SLCAN stream decoder.
#[derive(Debug, Default)]
pub struct SlcanDecoder {
    line: Vec<u8, MAX_LINE_LEN>,
    discarding: bool,
}

impl SlcanDecoder {
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            discarding: false,
        }
    }

    /// Feed one byte from the adapter.
    ///
    /// Returns `Some` when the byte completes a frame record or signals an
    /// error. Command acknowledgements and non-frame records yield `None`.
    pub fn push(
        &mut self,
        byte: u8,
    ) -> Option<Result<CanFrame, SlcanError>> {
        match byte {
            CR => {
                let discarded = core::mem::replace(&mut self.discarding, false);
                let result = if discarded || self.line.is_empty() {
                    None
                } else {
                    parse_frame(&self.line).transpose()
                };
                self.line.clear();
                result
            }
            BEL => {
                self.line.clear();
                self.discarding = false;
                Some(Err(SlcanError::AdapterNack))
            }
            b'\n' => None,
            _ if self.discarding => None,
            _ => {
                if self.line.push(byte).is_err() {
                    self.line.clear();
                    self.discarding = true;
                    return Some(Err(SlcanError::LineOverflow));
                }
                None
            }
        }
    }

    /// Drop any partially received record.
    pub fn reset(&mut self) {
        self.line.clear();
        self.discarding = false;
    }
}

/// Parse one record without its terminator.
///
/// `t`/`T` records decode to a frame; every other record (version strings,
/// transmit acks `z`/`Z`, status flags) yields `Ok(None)`.
pub fn parse_frame(line: &[u8]) -> Result<Option<CanFrame>, SlcanError> {
    let (id_digits, extended) = match line.first() {
        Some(b't') => (3, false),
        Some(b'T') => (8, true),
        _ => return Ok(None),
    };

    let dlc_pos = 1 + id_digits;
    if line.len() <= dlc_pos {
        return Err(SlcanError::Malformed);
    }

    let id = parse_hex(&line[1..dlc_pos]).ok_or(SlcanError::Malformed)?;
    let dlc = usize::from(hex_nibble(line[dlc_pos]).ok_or(SlcanError::Malformed)?);
    if dlc > CAN_PAYLOAD_LEN {
        return Err(SlcanError::InvalidLength);
    }

    let data_hex = &line[dlc_pos + 1..];
    let data_len = 2 * dlc;
    if data_hex.len() != data_len && data_hex.len() != data_len + TIMESTAMP_DIGITS {
        return Err(SlcanError::InvalidLength);
    }

    let mut data = [0u8; CAN_PAYLOAD_LEN];
    for (i, pair) in data_hex[..data_len].chunks_exact(2).enumerate() {
        let hi = hex_nibble(pair[0]).ok_or(SlcanError::Malformed)?;
        let lo = hex_nibble(pair[1]).ok_or(SlcanError::Malformed)?;
        data[i] = (hi << 4) | lo;
    }
    if data_hex.len() > data_len && parse_hex(&data_hex[data_len..]).is_none() {
        return Err(SlcanError::Malformed);
    }

    let frame = if extended {
        CanFrame::extended(id, &data[..dlc])
    } else {
        u16::try_from(id).ok().and_then(|id| CanFrame::standard(id, &data[..dlc]))
    };
    frame.map(Some).ok_or(SlcanError::InvalidIdentifier)
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn parse_hex(digits: &[u8]) -> Option<u32> {
    digits
        .iter()
        .try_fold(0u32, |acc, &c| Some((acc << 4) | u32::from(hex_nibble(c)?)))
}

// =============================================================================
// Commands
// =============================================================================

/// Standard SLCAN bitrates (`S0`..`S8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlcanBitrate {
    Kbps10 = 0,
    Kbps20 = 1,
    Kbps50 = 2,
    Kbps100 = 3,
    Kbps125 = 4,
    Kbps250 = 5,
    Kbps500 = 6,
    Kbps800 = 7,
    Mbps1 = 8,
}

impl SlcanBitrate {
    /// Map a bus speed in bit/s to its setup code, if it is a standard one.
    pub const fn from_bps(bps: u32) -> Option<Self> {
        Some(match bps {
            10_000 => Self::Kbps10,
            20_000 => Self::Kbps20,
            50_000 => Self::Kbps50,
            100_000 => Self::Kbps100,
            125_000 => Self::Kbps125,
            250_000 => Self::Kbps250,
            500_000 => Self::Kbps500,
            800_000 => Self::Kbps800,
            1_000_000 => Self::Mbps1,
            _ => return None,
        })
    }

    #[inline]
    pub const fn code(self) -> u8 { self as u8 }
}

/// Adapter commands the bridge issues at startup and shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlcanCommand {
    Close,
    Open,
    Bitrate(SlcanBitrate),
    AcceptanceCode(u32),
    AcceptanceMask(u32),
}

impl SlcanCommand {
    /// ASCII form including the trailing `\r`.
    pub fn encode(&self) -> String<MAX_COMMAND_LEN> {
        let mut out = String::new();
        // Every variant fits MAX_COMMAND_LEN
        match *self {
            Self::Close => out.push_str("C\r").ok(),
            Self::Open => out.push_str("O\r").ok(),
            Self::Bitrate(rate) => write!(out, "S{}\r", rate.code()).ok(),
            Self::AcceptanceCode(code) => write!(out, "M{code:08X}\r").ok(),
            Self::AcceptanceMask(mask) => write!(out, "m{mask:08X}\r").ok(),
        };
        out
    }
}

/// SJA1000-style acceptance code and mask for a standard-id filter.
///
/// The identifier sits in the top 11 bits of the 32-bit register; a set mask
/// bit means "don't care", which is the inverse of [`CanFilter::mask`].
pub const fn acceptance_for(filter: &CanFilter) -> (u32, u32) {
    let code = (filter.id & 0x7FF) << 21;
    let mask = !((filter.mask & 0x7FF) << 21);
    (code, mask)
}

/// Startup sequence for a filtered bus at `bitrate`: close, set speed,
/// acceptance code/mask, open.
pub fn open_sequence(
    bitrate: SlcanBitrate,
    filter: &CanFilter,
) -> [SlcanCommand; 5] {
    let (code, mask) = acceptance_for(filter);
    [
        SlcanCommand::Close,
        SlcanCommand::Bitrate(bitrate),
        SlcanCommand::AcceptanceCode(code),
        SlcanCommand::AcceptanceMask(mask),
        SlcanCommand::Open,
    ]
}

// =============================================================================
// Tests
// =============================================================================
