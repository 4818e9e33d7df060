//! CAN frame and acceptance filter.
//!
//! [`CanFrame`] implements [`embedded_can::Frame`], so frames from any
//! `embedded-can` driver convert into it with [`CanFrame::from_frame`].

use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Classic CAN payload size.
pub const CAN_PAYLOAD_LEN: usize = 8;

// =============================================================================
// Acceptance Filter
// =============================================================================

/// Identifier/mask acceptance filter.
///
/// A frame passes when every identifier bit selected by `mask` matches `id`.
/// With id `0x90` and mask `0x7FE` both 144 (`0x90`) and 145 (`0x91`) pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFilter {
    pub id: u32,
    pub mask: u32,
}

impl CanFilter {
    pub const fn new(
        id: u32,
        mask: u32,
    ) -> Self {
        Self { id, mask }
    }

    /// True when `identifier` passes this filter.
    #[inline]
    pub const fn accepts(
        &self,
        identifier: u32,
    ) -> bool {
        (identifier & self.mask) == (self.id & self.mask)
    }
}

// =============================================================================
// Frame
// =============================================================================

/// A received data frame, payload zero-padded to 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    dlc: u8,
    payload: [u8; CAN_PAYLOAD_LEN],
}

impl CanFrame {
    /// Build a standard-id data frame. Returns `None` if the identifier does
    /// not fit 11 bits or `data` is longer than 8 bytes.
    pub fn standard(
        identifier: u16,
        data: &[u8],
    ) -> Option<Self> {
        let id = StandardId::new(identifier)?;
        <Self as Frame>::new(id, data)
    }

    /// Build an extended-id data frame. Returns `None` if the identifier does
    /// not fit 29 bits or `data` is longer than 8 bytes.
    pub fn extended(
        identifier: u32,
        data: &[u8],
    ) -> Option<Self> {
        let id = ExtendedId::new(identifier)?;
        <Self as Frame>::new(id, data)
    }

    /// Convert any `embedded-can` frame. Remote frames carry no payload and
    /// are rejected.
    pub fn from_frame<F: Frame>(frame: &F) -> Option<Self> {
        if frame.is_remote_frame() {
            return None;
        }
        <Self as Frame>::new(frame.id(), frame.data())
    }

    /// Raw identifier, standard and extended flattened to `u32`.
    #[inline]
    pub fn identifier(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }

    /// Full 8-byte payload; bytes past the DLC are zero.
    #[inline]
    pub const fn payload(&self) -> &[u8; CAN_PAYLOAD_LEN] { &self.payload }
}

impl Frame for CanFrame {
    fn new(
        id: impl Into<Id>,
        data: &[u8],
    ) -> Option<Self> {
        if data.len() > CAN_PAYLOAD_LEN {
            return None;
        }
        let mut payload = [0u8; CAN_PAYLOAD_LEN];
        payload[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            dlc: data.len() as u8,
            payload,
        })
    }

    fn new_remote(
        _id: impl Into<Id>,
        _dlc: usize,
    ) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool { matches!(self.id, Id::Extended(_)) }

    fn is_remote_frame(&self) -> bool { false }

    fn id(&self) -> Id { self.id }

    fn dlc(&self) -> usize { self.dlc as usize }

    fn data(&self) -> &[u8] { &self.payload[..self.dlc as usize] }
}

// =============================================================================
// Tests
// =============================================================================
