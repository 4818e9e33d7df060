//! Latest payload per tracked CAN identifier.
//!
//! The store holds exactly two 8-byte buffers, one for the engine frame and
//! one for the electrical frame. A matching frame replaces its buffer
//! wholesale; nothing is ever partially updated. Before the first frame a
//! buffer reads as all zeros.

use super::frame::{CAN_PAYLOAD_LEN, CanFrame};

/// Which tracked buffer a frame landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameSlot {
    /// IAT, RPM, MAP.
    Engine,
    /// AFR, battery voltage, EGT.
    Electrical,
}

impl FrameSlot {
    pub const ALL: [Self; 2] = [Self::Engine, Self::Electrical];

    #[inline]
    const fn index(self) -> usize { self as usize }
}

/// Owner of the two frame buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStore {
    ids: [u32; 2],
    buffers: [[u8; CAN_PAYLOAD_LEN]; 2],
    received: [bool; 2],
}

impl FrameStore {
    /// Create a store tracking `engine_id` and `electrical_id`.
    pub const fn new(
        engine_id: u32,
        electrical_id: u32,
    ) -> Self {
        Self {
            ids: [engine_id, electrical_id],
            buffers: [[0; CAN_PAYLOAD_LEN]; 2],
            received: [false; 2],
        }
    }

    /// Replace the buffer tracked under `identifier`.
    ///
    /// Unknown identifiers are ignored and yield `None`.
    pub fn update(
        &mut self,
        identifier: u32,
        payload: &[u8; CAN_PAYLOAD_LEN],
    ) -> Option<FrameSlot> {
        let slot = self.slot_for(identifier)?;
        self.buffers[slot.index()] = *payload;
        self.received[slot.index()] = true;
        Some(slot)
    }

    /// [`update`](Self::update) from a received frame.
    #[inline]
    pub fn ingest(
        &mut self,
        frame: &CanFrame,
    ) -> Option<FrameSlot> {
        self.update(frame.identifier(), frame.payload())
    }

    /// Slot tracking `identifier`, if any.
    pub fn slot_for(
        &self,
        identifier: u32,
    ) -> Option<FrameSlot> {
        FrameSlot::ALL.into_iter().find(|slot| self.ids[slot.index()] == identifier)
    }

    #[inline]
    pub const fn buffer(
        &self,
        slot: FrameSlot,
    ) -> &[u8; CAN_PAYLOAD_LEN] {
        &self.buffers[slot.index()]
    }

    /// Whether a frame for `slot` has arrived since construction.
    #[inline]
    pub const fn has_received(
        &self,
        slot: FrameSlot,
    ) -> bool {
        self.received[slot.index()]
    }

    /// 16-bit field `index` (1-based) of `slot`'s buffer.
    #[inline]
    pub fn field16(
        &self,
        slot: FrameSlot,
        index: usize,
    ) -> u16 {
        read_field16(self.buffer(slot), index)
    }
}

/// Decode the big-endian `u16` at 1-based field `index` of `data`.
///
/// Field `i` occupies bytes `2i-2` and `2i-1`. Index 0 and any field that
/// would read past the end of `data` decode as 0.
pub fn read_field16(
    data: &[u8],
    index: usize,
) -> u16 {
    let Some(pos) = index.checked_sub(1).and_then(|i| i.checked_mul(2)) else {
        return 0;
    };
    match (data.get(pos), data.get(pos + 1)) {
        (Some(&hi), Some(&lo)) => u16::from_be_bytes([hi, lo]),
        _ => 0,
    }
}

// =============================================================================
// Tests
// =============================================================================
