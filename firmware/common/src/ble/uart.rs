//! UART-over-BLE peripheral.
//!
//! [`BleUartBridge`] owns the radio and the set of connected centrals.
//! Telemetry goes out as notifications on the TX characteristic to every
//! connection; a central dropping off re-arms advertising so the next one can
//! find the device.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use super::advertising::{AdvFlags, AdvertisingBuilder, AdvertisingPayload};
use super::radio::{BleEvent, BleEventChannel, BleRadio, ConnHandle, UART_SERVICE, UartHandles};
use crate::config::MAX_CONNECTIONS;
use crate::error::BridgeError;
use crate::fmt::dbg_fmt;

// =============================================================================
// Connection Set
// =============================================================================

/// Connection set is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full;

/// Handles of currently connected centrals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSet {
    handles: Vec<ConnHandle, MAX_CONNECTIONS>,
}

impl ConnectionSet {
    pub const fn new() -> Self { Self { handles: Vec::new() } }

    /// Add `handle`. Already-present handles are a no-op.
    pub fn insert(
        &mut self,
        handle: ConnHandle,
    ) -> Result<(), Full> {
        if self.contains(handle) {
            return Ok(());
        }
        self.handles.push(handle).map_err(|_| Full)
    }

    /// Remove `handle`, returning whether it was present.
    pub fn remove(
        &mut self,
        handle: ConnHandle,
    ) -> bool {
        match self.handles.iter().position(|&h| h == handle) {
            Some(pos) => {
                self.handles.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(
        &self,
        handle: ConnHandle,
    ) -> bool {
        self.handles.contains(&handle)
    }

    #[inline]
    pub fn len(&self) -> usize { self.handles.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.handles.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = ConnHandle> + '_ { self.handles.iter().copied() }
}

// =============================================================================
// Bridge
// =============================================================================

/// Outcome of one [`BleUartBridge::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Running UART peripheral: radio powered, service registered, advertising.
pub struct BleUartBridge<R: BleRadio> {
    radio: R,
    handles: UartHandles,
    payload: AdvertisingPayload,
    interval_us: u32,
    connections: ConnectionSet,
}

impl<R: BleRadio> BleUartBridge<R> {
    /// Bring the peripheral up.
    ///
    /// The advertising payload is validated before the radio is powered; if a
    /// radio step fails after activation the radio is powered down again.
    pub fn start(
        mut radio: R,
        name: &str,
        interval_us: u32,
    ) -> Result<Self, BridgeError> {
        let payload = AdvertisingBuilder::new()
            .flags(AdvFlags::LE_GENERAL)
            .name(name)
            .service(UART_SERVICE)
            .build()?;

        radio.set_active(true).map_err(|e| {
            error!("radio activation failed: {}", dbg_fmt(&e));
            BridgeError::RadioUnavailable
        })?;

        let handles = match radio.register_uart_service() {
            Ok(handles) => handles,
            Err(e) => {
                error!("UART service registration failed: {}", dbg_fmt(&e));
                power_down(&mut radio);
                return Err(BridgeError::ServiceRegistration);
            }
        };

        if let Err(e) = radio.advertise(interval_us, payload.as_bytes()) {
            error!("advertising failed: {}", dbg_fmt(&e));
            power_down(&mut radio);
            return Err(BridgeError::Advertise);
        }

        info!("BLE advertising, {} byte payload", payload.len());
        Ok(Self {
            radio,
            handles,
            payload,
            interval_us,
            connections: ConnectionSet::new(),
        })
    }

    /// Track a new central. Beyond capacity the connection is logged and
    /// ignored.
    pub fn on_connect(
        &mut self,
        handle: ConnHandle,
    ) {
        match self.connections.insert(handle) {
            Ok(()) => info!("central connected: {}", handle),
            Err(Full) => warn!("connection limit reached, ignoring {}", handle),
        }
    }

    /// Forget a central and advertise again.
    pub fn on_disconnect(
        &mut self,
        handle: ConnHandle,
    ) {
        if self.connections.remove(handle) {
            info!("central disconnected: {}", handle);
        }
        if let Err(e) = self.radio.advertise(self.interval_us, self.payload.as_bytes()) {
            warn!("re-advertise failed: {}", dbg_fmt(&e));
        }
    }

    pub fn handle_event(
        &mut self,
        event: BleEvent,
    ) {
        match event {
            BleEvent::Connected(handle) => self.on_connect(handle),
            BleEvent::Disconnected(handle) => self.on_disconnect(handle),
        }
    }

    /// Apply every queued connection event. Returns how many were handled.
    pub fn drain_events<M: RawMutex, const N: usize>(
        &mut self,
        events: &BleEventChannel<M, N>,
    ) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_receive() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Notify `data` to every connected central.
    ///
    /// A failed notify is logged and counted; delivery to the remaining
    /// connections continues.
    pub fn send(
        &mut self,
        data: &[u8],
    ) -> SendReport {
        let mut report = SendReport::default();
        for conn in self.connections.iter() {
            match self.radio.notify(conn, self.handles.tx, data) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("notify to {} failed: {}", conn, dbg_fmt(&e));
                    report.failed += 1;
                }
            }
        }
        report
    }

    #[inline]
    pub const fn connections(&self) -> &ConnectionSet { &self.connections }

    #[inline]
    pub const fn payload(&self) -> &AdvertisingPayload { &self.payload }

    #[inline]
    pub const fn handles(&self) -> UartHandles { self.handles }

    #[inline]
    pub const fn radio(&self) -> &R { &self.radio }

    /// Power the radio down and hand it back.
    pub fn shutdown(mut self) -> R {
        power_down(&mut self.radio);
        self.radio
    }
}

fn power_down<R: BleRadio>(radio: &mut R) {
    if let Err(e) = radio.set_active(false) {
        warn!("radio deactivation failed: {}", dbg_fmt(&e));
    }
}

// =============================================================================
// Tests
// =============================================================================
