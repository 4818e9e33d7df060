//! Hand-off from the synchronous bridge to the async BLE task.
//!
//! The bridge calls [`BleRadio`] from the main loop and must never wait on
//! the radio. [`ChannelRadio`] turns each call into a [`RadioRequest`] on a
//! bounded channel; the BLE task owns the host stack and works through the
//! queue. A full queue is reported as an error so the caller can count it as
//! a failed send.

use canbridge_common::ble::{AttrHandle, BleRadio, ConnHandle, MAX_ADV_LEN, UartHandles};
use canbridge_common::telemetry::TELEGRAM_LEN;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Requests buffered between two BLE task wake-ups.
pub const REQUEST_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioRequest {
    SetActive(bool),
    Advertise {
        interval_us: u32,
        payload: Vec<u8, MAX_ADV_LEN>,
    },
    Notify {
        conn: ConnHandle,
        data: Vec<u8, TELEGRAM_LEN>,
    },
}

pub type RequestChannel<M, const N: usize> = Channel<M, RadioRequest, N>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("radio request queue full")]
    QueueFull,

    #[error("{len} bytes do not fit one request")]
    TooLong { len: usize },
}

/// [`BleRadio`] backed by a request queue.
///
/// The GATT table is built by the BLE task before this is created, so
/// `register_uart_service` only hands back the handles it was given.
pub struct ChannelRadio<'a, M: RawMutex, const N: usize> {
    requests: &'a RequestChannel<M, N>,
    handles: UartHandles,
}

impl<'a, M: RawMutex, const N: usize> ChannelRadio<'a, M, N> {
    pub const fn new(
        requests: &'a RequestChannel<M, N>,
        handles: UartHandles,
    ) -> Self {
        Self { requests, handles }
    }

    fn submit(
        &self,
        request: RadioRequest,
    ) -> Result<(), LinkError> {
        self.requests.try_send(request).map_err(|_| LinkError::QueueFull)
    }
}

impl<M: RawMutex, const N: usize> BleRadio for ChannelRadio<'_, M, N> {
    type Error = LinkError;

    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Self::Error> {
        self.submit(RadioRequest::SetActive(active))
    }

    fn register_uart_service(&mut self) -> Result<UartHandles, Self::Error> { Ok(self.handles) }

    fn advertise(
        &mut self,
        interval_us: u32,
        payload: &[u8],
    ) -> Result<(), Self::Error> {
        let payload = Vec::from_slice(payload).map_err(|_| LinkError::TooLong { len: payload.len() })?;
        self.submit(RadioRequest::Advertise { interval_us, payload })
    }

    /// Only the TX characteristic is ever notified, so `attr` is not queued.
    fn notify(
        &mut self,
        conn: ConnHandle,
        _attr: AttrHandle,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let data = Vec::from_slice(data).map_err(|_| LinkError::TooLong { len: data.len() })?;
        self.submit(RadioRequest::Notify { conn, data })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::*;

    const HANDLES: UartHandles = UartHandles {
        tx: AttrHandle(0x10),
        rx: AttrHandle(0x12),
    };

    #[test]
    fn test_register_returns_given_handles() {
        let requests: RequestChannel<NoopRawMutex, 4> = Channel::new();
        let mut radio = ChannelRadio::new(&requests, HANDLES);
        assert_eq!(radio.register_uart_service(), Ok(HANDLES));
        assert!(requests.is_empty());
    }

    #[test]
    fn test_calls_become_requests_in_order() {
        let requests: RequestChannel<NoopRawMutex, 4> = Channel::new();
        let mut radio = ChannelRadio::new(&requests, HANDLES);

        radio.set_active(true).unwrap();
        radio.advertise(500_000, &[0x02, 0x01, 0x06]).unwrap();
        radio.notify(ConnHandle(3), HANDLES.tx, b"IAT:25\n").unwrap();

        assert_eq!(requests.try_receive(), Ok(RadioRequest::SetActive(true)));
        assert_eq!(
            requests.try_receive(),
            Ok(RadioRequest::Advertise {
                interval_us: 500_000,
                payload: Vec::from_slice(&[0x02, 0x01, 0x06]).unwrap(),
            })
        );
        assert_eq!(
            requests.try_receive(),
            Ok(RadioRequest::Notify {
                conn: ConnHandle(3),
                data: Vec::from_slice(b"IAT:25\n").unwrap(),
            })
        );
    }

    #[test]
    fn test_full_queue_fails_without_blocking() {
        let requests: RequestChannel<NoopRawMutex, 1> = Channel::new();
        let mut radio = ChannelRadio::new(&requests, HANDLES);
        radio.notify(ConnHandle(1), HANDLES.tx, b"a").unwrap();
        assert_eq!(radio.notify(ConnHandle(1), HANDLES.tx, b"b"), Err(LinkError::QueueFull));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let requests: RequestChannel<NoopRawMutex, 4> = Channel::new();
        let mut radio = ChannelRadio::new(&requests, HANDLES);
        let long = [0u8; MAX_ADV_LEN + 1];
        assert_eq!(radio.advertise(500_000, &long), Err(LinkError::TooLong { len: MAX_ADV_LEN + 1 }));
        assert!(requests.is_empty());
    }
}
