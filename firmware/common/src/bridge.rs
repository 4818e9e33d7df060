//! The bridge context and its per-tick pipeline.
//!
//! [`Bridge`] owns every piece of mutable state: frame buffers, link monitor,
//! display phase, send throttle and the two optional subsystems. The platform
//! main loop calls [`Bridge::tick`] every ~10 ms:
//!
//! ```text
//! BLE events ─▶ CAN poll ─▶ FrameStore ─▶ ConnectivityMonitor ─▶ status label
//!                                 │
//!                                 ├─▶ DisplayScheduler ─▶ gauge labels
//!                                 └─▶ (online, ≥200 ms) telegram ─▶ BLE notify
//! ```
//!
//! Subsystems that fail to start stay `None` and the bridge keeps running in
//! degraded mode. The only error that escapes a tick is a display failure.

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::ble::{BleEventChannel, BleRadio, BleUartBridge, SendReport};
use crate::can::{CanPeripheral, FrameSlot, FrameStore};
use crate::config::BridgeConfig;
use crate::connectivity::{ConnectivityMonitor, LinkState};
use crate::display::Dashboard;
use crate::error::BridgeError;
use crate::fmt::dbg_fmt;
use crate::scheduler::{DisplayScheduler, Updated};
use crate::status::{LinkStatus, RadioStatus, show_link, show_radio};
use crate::telemetry::encode_telegram;

/// Frames drained from the CAN peripheral per tick.
pub const FRAMES_PER_TICK: usize = 8;

// =============================================================================
// Send Throttle
// =============================================================================

/// Gate that opens once more than `interval_ms` has passed since the last
/// send. Closed sends are skipped, never queued.
#[derive(Debug, Clone)]
pub struct SendThrottle {
    interval_ms: u64,
    last_sent_ms: Option<u64>,
}

impl SendThrottle {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: None,
        }
    }

    /// If the gate is open at `now_ms`, close it and return `true`.
    pub fn try_acquire(
        &mut self,
        now_ms: u64,
    ) -> bool {
        let open = match self.last_sent_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.interval_ms,
        };
        if open {
            self.last_sent_ms = Some(now_ms);
        }
        open
    }
}

// =============================================================================
// Tick Report
// =============================================================================

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// BLE connection events applied.
    pub events: usize,
    /// Tracked frames stored.
    pub frames: usize,
    /// Link transition, if any.
    pub link: Option<LinkState>,
    /// Gauge labels refreshed.
    pub updated: Updated,
    /// Telemetry delivery, if a telegram went out.
    pub sent: Option<SendReport>,
}

/// Subsystems handed back by [`Bridge::shutdown`].
pub struct Released<C, R> {
    pub can: Option<C>,
    pub radio: Option<R>,
}

// =============================================================================
// Bridge
// =============================================================================

/// Owned bridge context.
pub struct Bridge<C: CanPeripheral, R: BleRadio> {
    config: BridgeConfig,
    store: FrameStore,
    monitor: ConnectivityMonitor,
    scheduler: DisplayScheduler,
    throttle: SendThrottle,
    can: Option<C>,
    ble: Option<BleUartBridge<R>>,
}

impl<C: CanPeripheral, R: BleRadio> Bridge<C, R> {
    /// Context with no subsystems started.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            store: FrameStore::new(config.engine_id, config.electrical_id),
            monitor: ConnectivityMonitor::new(config.offline_timeout_ms),
            scheduler: DisplayScheduler::new(),
            throttle: SendThrottle::new(config.telemetry_interval_ms),
            can: None,
            ble: None,
            config,
        }
    }

    /// Start the BLE UART peripheral on `radio`, or report it missing.
    ///
    /// A radio failure is shown on the footer and leaves BLE disabled; only a
    /// display failure is returned as an error.
    pub fn start_ble<D: Dashboard>(
        &mut self,
        radio: Option<R>,
        display: &mut D,
    ) -> Result<RadioStatus, BridgeError> {
        let status = match radio {
            None => {
                warn!("no BLE radio, telemetry disabled");
                RadioStatus::Missing
            }
            Some(radio) => match BleUartBridge::start(radio, self.config.device_name, self.config.adv_interval_us) {
                Ok(ble) => {
                    self.ble = Some(ble);
                    RadioStatus::Ok
                }
                Err(e) => {
                    error!("BLE start failed: {}", e);
                    RadioStatus::Error(e)
                }
            },
        };
        show_radio(display, status).map_err(display_error)?;
        Ok(status)
    }

    /// Adopt the CAN peripheral `can` (or its initialization failure).
    ///
    /// The acceptance filter is applied once; if that fails the bridge logs it
    /// and runs unfiltered.
    pub fn start_can<D: Dashboard, E: Debug>(
        &mut self,
        can: Result<C, E>,
        display: &mut D,
    ) -> Result<LinkStatus, BridgeError> {
        let status = match can {
            Ok(mut can) => {
                match can.set_filter(&self.config.filter) {
                    Ok(()) => info!("CAN filter id={=u32:#x} mask={=u32:#x}", self.config.filter.id, self.config.filter.mask),
                    Err(e) => warn!("CAN filter setup failed, running unfiltered: {}", dbg_fmt(&e)),
                }
                self.can = Some(can);
                LinkStatus::Off
            }
            Err(e) => {
                error!("CAN init failed: {}", dbg_fmt(&e));
                LinkStatus::CanError
            }
        };
        show_link(display, status).map_err(display_error)?;
        Ok(status)
    }

    /// Run one loop iteration at `now_ms`.
    pub fn tick<M: RawMutex, const N: usize, D: Dashboard>(
        &mut self,
        now_ms: u64,
        events: &BleEventChannel<M, N>,
        display: &mut D,
    ) -> Result<TickReport, BridgeError> {
        let mut report = TickReport::default();

        if let Some(ble) = self.ble.as_mut() {
            report.events = ble.drain_events(events);
        }

        report.frames = self.poll_can(now_ms);
        if report.frames > 0 {
            report.link = self.monitor.observe(now_ms);
        }
        if let Some(state) = self.monitor.tick(now_ms) {
            report.link = Some(state);
        }
        if let Some(state) = report.link {
            show_link(display, state.into()).map_err(display_error)?;
        }

        report.updated = self.scheduler.tick(&self.store, display).map_err(display_error)?;

        if self.monitor.is_online()
            && let Some(ble) = self.ble.as_mut()
            && self.throttle.try_acquire(now_ms)
        {
            let telegram = encode_telegram(&self.store);
            let sent = ble.send(telegram.as_bytes());
            trace!("telemetry sent to {} of {}", sent.delivered, sent.delivered + sent.failed);
            report.sent = Some(sent);
        }

        Ok(report)
    }

    /// Drain up to [`FRAMES_PER_TICK`] frames; returns how many were tracked.
    fn poll_can(
        &mut self,
        now_ms: u64,
    ) -> usize {
        let Some(can) = self.can.as_mut() else {
            return 0;
        };
        let mut tracked = 0;
        for _ in 0..FRAMES_PER_TICK {
            match can.receive(0) {
                Ok(Some(frame)) => {
                    if let Some(slot) = self.store.ingest(&frame) {
                        trace!("frame {=u32} -> {} at {=u64}", frame.identifier(), slot, now_ms);
                        tracked += 1;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("CAN receive failed: {}", dbg_fmt(&e));
                    break;
                }
            }
        }
        tracked
    }

    /// Deinitialize CAN and power the radio down, handing both back.
    pub fn shutdown(&mut self) -> Released<C, R> {
        let can = self.can.take().map(|mut can| {
            can.deinit();
            can
        });
        let radio = self.ble.take().map(BleUartBridge::shutdown);
        info!("bridge shut down");
        Released { can, radio }
    }

    #[inline]
    pub const fn store(&self) -> &FrameStore { &self.store }

    #[inline]
    pub const fn link_state(&self) -> LinkState { self.monitor.state() }

    #[inline]
    pub const fn config(&self) -> &BridgeConfig { &self.config }

    #[inline]
    pub fn ble(&self) -> Option<&BleUartBridge<R>> { self.ble.as_ref() }

    #[inline]
    pub fn can(&self) -> Option<&C> { self.can.as_ref() }

    /// The CAN peripheral, for feeding a simulated bus.
    #[inline]
    pub fn can_mut(&mut self) -> Option<&mut C> { self.can.as_mut() }

    /// Whether a frame for `slot` has been seen.
    #[inline]
    pub const fn has_received(
        &self,
        slot: FrameSlot,
    ) -> bool {
        self.store.has_received(slot)
    }
}

fn display_error<E: Debug>(e: E) -> BridgeError {
    error!("display update failed: {}", dbg_fmt(&e));
    BridgeError::Display
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;

    use super::*;
    use crate::ble::{BleEvent, ConnHandle};
    use crate::can::CanFrame;
    use crate::colors;
    use crate::display::{LabelBoard, LabelId};
    use crate::mocks::{MockCan, MockRadio, RadioCall, RecordingDashboard};
    use crate::telemetry::Gauge;

    type Events = BleEventChannel<NoopRawMutex, 8>;
    type TestBridge = Bridge<MockCan, MockRadio>;

    fn engine_frame() -> CanFrame { CanFrame::standard(144, &[0x00, 0x64, 0x0B, 0xB8, 0x00, 0xFA, 0, 0]).unwrap() }

    fn electrical_frame() -> CanFrame { CanFrame::standard(145, &[0x00, 0x96, 0x23, 0x28, 0x00, 0x2C, 0, 0]).unwrap() }

    fn running(
        can: MockCan,
        radio: MockRadio,
        board: &mut LabelBoard,
    ) -> TestBridge {
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        bridge.start_ble(Some(radio), board).unwrap();
        bridge.start_can(Ok::<_, ()>(can), board).unwrap();
        bridge
    }

    #[test]
    fn test_throttle_gate() {
        let mut throttle = SendThrottle::new(200);
        assert!(throttle.try_acquire(1000));
        assert!(!throttle.try_acquire(1150));
        assert!(!throttle.try_acquire(1200));
        assert!(throttle.try_acquire(1201));
    }

    #[test]
    fn test_throttle_sends_150_vs_250_apart() {
        let mut a = SendThrottle::new(200);
        assert_eq!([a.try_acquire(0), a.try_acquire(150)], [true, false]);
        let mut b = SendThrottle::new(200);
        assert_eq!([b.try_acquire(0), b.try_acquire(250)], [true, true]);
    }

    #[test]
    fn test_startup_statuses() {
        let mut board = LabelBoard::new();
        let bridge = running(MockCan::new(), MockRadio::new(), &mut board);
        assert_eq!(board.text(LabelId::LinkStatus), "OFF");
        assert_eq!(board.text(LabelId::RadioStatus), "BLE OK");
        assert_eq!(bridge.can().unwrap().filter, Some(BridgeConfig::DEFAULT.filter));
    }

    #[test]
    fn test_missing_radio_degrades() {
        let mut board = LabelBoard::new();
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        assert_eq!(bridge.start_ble(None, &mut board), Ok(RadioStatus::Missing));
        assert_eq!(board.text(LabelId::RadioStatus), "BLE Missing");
        assert_eq!(board.label(LabelId::RadioStatus).color, colors::ERROR);
        assert!(bridge.ble().is_none());
    }

    #[test]
    fn test_radio_failure_shows_reason() {
        let mut board = LabelBoard::new();
        let mut radio = MockRadio::new();
        radio.fail_activate = true;
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        let status = bridge.start_ble(Some(radio), &mut board).unwrap();
        assert_eq!(status, RadioStatus::Error(BridgeError::RadioUnavailable));
        assert_eq!(board.text(LabelId::RadioStatus), "BLE Err: no radio");
    }

    #[test]
    fn test_long_name_reports_payload_too_large() {
        let mut board = LabelBoard::new();
        let config = BridgeConfig {
            device_name: "CAN-BRIDGE-XYZ",
            ..BridgeConfig::DEFAULT
        };
        let mut bridge = TestBridge::new(config);
        let status = bridge.start_ble(Some(MockRadio::new()), &mut board).unwrap();
        assert_eq!(status, RadioStatus::Error(BridgeError::PayloadTooLarge { len: 37 }));
    }

    #[test]
    fn test_can_init_failure_shows_can_err() {
        let mut board = LabelBoard::new();
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        let status = bridge.start_can(Err::<MockCan, _>("no transceiver"), &mut board).unwrap();
        assert_eq!(status, LinkStatus::CanError);
        assert_eq!(board.text(LabelId::LinkStatus), "CAN Err");

        // Loop keeps running without CAN
        let events = Events::new();
        let report = bridge.tick(10, &events, &mut board).unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(board.text(LabelId::LinkStatus), "CAN Err");
    }

    #[test]
    fn test_filter_failure_is_not_fatal() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.fail_filter = true;
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        assert_eq!(bridge.start_can(Ok::<_, ()>(can), &mut board), Ok(LinkStatus::Off));
        assert!(bridge.can().is_some());
    }

    #[test]
    fn test_frame_brings_link_online_and_sends() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.push(engine_frame());
        can.push(electrical_frame());
        let mut bridge = running(can, MockRadio::new(), &mut board);
        let events = Events::new();
        events.try_send(BleEvent::Connected(ConnHandle(1))).unwrap();

        let report = bridge.tick(1000, &events, &mut board).unwrap();
        assert_eq!(report.events, 1);
        assert_eq!(report.frames, 2);
        assert_eq!(report.link, Some(LinkState::Online));
        assert_eq!(board.text(LabelId::LinkStatus), "ONLINE");
        assert_eq!(board.label(LabelId::LinkStatus).color, colors::STATUS_ONLINE);

        let sent = report.sent.unwrap();
        assert_eq!(sent.delivered, 1);
        let radio = bridge.ble().unwrap().radio();
        assert_eq!(radio.notified[0].1, b"3000,150,15.0,100,90.0,44\n");
    }

    #[test]
    fn test_no_send_while_offline() {
        let mut board = LabelBoard::new();
        let mut bridge = running(MockCan::new(), MockRadio::new(), &mut board);
        let events = Events::new();
        events.try_send(BleEvent::Connected(ConnHandle(1))).unwrap();
        let report = bridge.tick(1000, &events, &mut board).unwrap();
        assert_eq!(report.sent, None);
    }

    #[test]
    fn test_send_throttled_between_ticks() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.push(engine_frame());
        let mut bridge = running(can, MockRadio::new(), &mut board);
        let events = Events::new();

        assert!(bridge.tick(1000, &events, &mut board).unwrap().sent.is_some());
        bridge.can_mut().unwrap().push(engine_frame());
        assert!(bridge.tick(1150, &events, &mut board).unwrap().sent.is_none());
        bridge.can_mut().unwrap().push(engine_frame());
        assert!(bridge.tick(1250, &events, &mut board).unwrap().sent.is_some());
    }

    #[test]
    fn test_link_drops_after_timeout() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.push(engine_frame());
        let mut bridge = running(can, MockRadio::new(), &mut board);
        let events = Events::new();

        bridge.tick(0, &events, &mut board).unwrap();
        assert_eq!(bridge.tick(1499, &events, &mut board).unwrap().link, None);
        assert_eq!(bridge.tick(1501, &events, &mut board).unwrap().link, Some(LinkState::Offline));
        assert_eq!(board.text(LabelId::LinkStatus), "OFF");
        assert_eq!(board.label(LabelId::LinkStatus).color, colors::STATUS_IDLE);
    }

    #[test]
    fn test_unknown_identifier_does_not_go_online() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.push(CanFrame::standard(0x100, &[1, 2, 3]).unwrap());
        let mut bridge = running(can, MockRadio::new(), &mut board);
        let events = Events::new();
        let report = bridge.tick(10, &events, &mut board).unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(bridge.link_state(), LinkState::Offline);
    }

    #[test]
    fn test_receive_error_is_transient() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.fail_next_receive = true;
        can.push(engine_frame());
        let mut bridge = running(can, MockRadio::new(), &mut board);
        let events = Events::new();

        assert_eq!(bridge.tick(10, &events, &mut board).unwrap().frames, 0);
        assert_eq!(bridge.tick(20, &events, &mut board).unwrap().frames, 1);
    }

    #[test]
    fn test_scheduler_drives_gauge_labels() {
        let mut board = LabelBoard::new();
        let mut can = MockCan::new();
        can.push(engine_frame());
        can.push(electrical_frame());
        let mut bridge = running(can, MockRadio::new(), &mut board);
        let events = Events::new();
        for t in 0..10 {
            bridge.tick(t * 10, &events, &mut board).unwrap();
        }
        assert_eq!(board.text(LabelId::Gauge(Gauge::Iat)), "100");
        assert_eq!(board.text(LabelId::Gauge(Gauge::Rpm)), "3000");
        assert_eq!(board.text(LabelId::Gauge(Gauge::Map)), "150");
        assert_eq!(board.text(LabelId::Gauge(Gauge::Afr)), "15.0");
        assert_eq!(board.text(LabelId::Gauge(Gauge::Volt)), "90.0V");
        assert_eq!(board.text(LabelId::Gauge(Gauge::Egt)), "44");
    }

    #[test]
    fn test_display_failure_escapes_tick() {
        let mut display = RecordingDashboard::new();
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        bridge.start_can(Ok::<_, ()>(MockCan::new()), &mut display).unwrap();
        display.fail = true;
        let events = Events::new();
        assert_eq!(bridge.tick(0, &events, &mut display), Err(BridgeError::Display));
    }

    #[test]
    fn test_shutdown_releases_subsystems() {
        let mut board = LabelBoard::new();
        let mut bridge = running(MockCan::new(), MockRadio::new(), &mut board);
        let released = bridge.shutdown();
        assert!(released.can.unwrap().deinitialized);
        assert_eq!(released.radio.unwrap().calls().last(), Some(&RadioCall::SetActive(false)));
        assert!(bridge.ble().is_none());
        assert!(bridge.can().is_none());
    }

    #[test]
    fn test_events_ignored_without_radio() {
        let mut board = LabelBoard::new();
        let mut bridge = TestBridge::new(BridgeConfig::DEFAULT);
        let events: Events = Channel::new();
        events.try_send(BleEvent::Connected(ConnHandle(1))).unwrap();
        let report = bridge.tick(0, &events, &mut board).unwrap();
        assert_eq!(report.events, 0);
    }
}
