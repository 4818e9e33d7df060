//! CAN side of the bridge: frames, the tracked-frame store, the SLCAN codec
//! and the peripheral interface.

pub mod frame;
pub mod slcan;
pub mod store;

use core::fmt::Debug;

pub use frame::{CanFilter, CanFrame};
pub use store::{FrameSlot, FrameStore, read_field16};

/// CAN controller the bridge polls.
pub trait CanPeripheral {
    type Error: Debug;

    /// Next received frame, waiting at most `timeout_ms` (0 polls).
    fn receive(
        &mut self,
        timeout_ms: u32,
    ) -> Result<Option<CanFrame>, Self::Error>;

    /// Program the hardware acceptance filter.
    fn set_filter(
        &mut self,
        filter: &CanFilter,
    ) -> Result<(), Self::Error>;

    /// Take the controller off the bus.
    fn deinit(&mut self);
}
