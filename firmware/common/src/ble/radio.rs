//! Interface to the vendor BLE stack.
//!
//! The bridge never touches the link layer. It needs the handful of GATT
//! server and advertising primitives in [`BleRadio`]; the firmware implements
//! them on top of `trouble-host`, the simulator prints them, tests record
//! them.

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use super::advertising::ServiceUuid;

// =============================================================================
// Nordic UART Service
// =============================================================================

/// Nordic UART Service.
pub const UART_SERVICE_UUID: u128 = 0x6E40_0001_B5A3_F393_E0A9_E50E_24DC_CA9E;

/// RX characteristic: central writes, unused by the bridge.
pub const UART_RX_UUID: u128 = 0x6E40_0002_B5A3_F393_E0A9_E50E_24DC_CA9E;

/// TX characteristic: device notifies telemetry.
pub const UART_TX_UUID: u128 = 0x6E40_0003_B5A3_F393_E0A9_E50E_24DC_CA9E;

/// Service UUID as it appears in the advertising payload.
pub const UART_SERVICE: ServiceUuid = ServiceUuid::from_u128(UART_SERVICE_UUID);

// =============================================================================
// Handles
// =============================================================================

/// Opaque connection handle assigned by the BLE stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// GATT attribute value handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttrHandle(pub u16);

/// Value handles of the registered UART service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartHandles {
    pub tx: AttrHandle,
    pub rx: AttrHandle,
}

// =============================================================================
// Radio Trait
// =============================================================================

/// GATT server and advertising primitives the bridge needs.
///
/// All methods are non-blocking from the caller's point of view; an
/// implementation backed by an async stack hands the request to its task.
pub trait BleRadio {
    type Error: Debug;

    /// Power the radio up or down.
    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Self::Error>;

    /// Register the UART service (TX notify, RX write) and return its handles.
    fn register_uart_service(&mut self) -> Result<UartHandles, Self::Error>;

    /// Start connectable advertising with `payload` every `interval_us`.
    fn advertise(
        &mut self,
        interval_us: u32,
        payload: &[u8],
    ) -> Result<(), Self::Error>;

    /// Send a notification on `attr` to one connection.
    fn notify(
        &mut self,
        conn: ConnHandle,
        attr: AttrHandle,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

// =============================================================================
// Events
// =============================================================================

/// Connection lifecycle reported by the BLE stack outside the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleEvent {
    Connected(ConnHandle),
    Disconnected(ConnHandle),
}

/// Bounded queue the radio side pushes [`BleEvent`]s into; the main loop
/// drains it at the top of each tick.
pub type BleEventChannel<M, const N: usize> = Channel<M, BleEvent, N>;

/// Push an event without blocking.
///
/// Returns `false` (and logs) if the queue is full; the event is dropped.
pub fn post_event<M: RawMutex, const N: usize>(
    events: &BleEventChannel<M, N>,
    event: BleEvent,
) -> bool {
    if events.try_send(event).is_err() {
        warn!("BLE event queue full, dropped {}", event);
        return false;
    }
    true
}
