//! Recording collaborators for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_graphics::pixelcolor::Rgb565;

use crate::ble::{AttrHandle, BleRadio, ConnHandle, UartHandles};
use crate::can::{CanFilter, CanFrame, CanPeripheral};
use crate::display::{Dashboard, LabelId};

// =============================================================================
// Radio
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCall {
    SetActive(bool),
    Register,
    Advertise(u32),
    Notify(ConnHandle, AttrHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioFault;

/// Call log shared between a [`MockRadio`] and the test that built it.
pub type CallLog = Rc<RefCell<Vec<RadioCall>>>;

#[derive(Debug, Default)]
pub struct MockRadio {
    /// Outlives the radio, so calls stay visible after it has been consumed.
    pub log: CallLog,
    /// Successful notifications only.
    pub notified: Vec<(ConnHandle, Vec<u8>)>,
    pub fail_activate: bool,
    pub fail_register: bool,
    pub fail_advertise: bool,
    pub failing_conn: Option<ConnHandle>,
}

impl MockRadio {
    pub const TX_HANDLE: u16 = 0x0010;
    pub const RX_HANDLE: u16 = 0x0012;

    pub fn new() -> Self { Self::default() }

    /// Handle on the call log that stays valid once the radio is moved.
    pub fn call_log(&self) -> CallLog { Rc::clone(&self.log) }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<RadioCall> { self.log.borrow().clone() }

    fn record(
        &self,
        call: RadioCall,
    ) {
        self.log.borrow_mut().push(call);
    }
}

impl BleRadio for MockRadio {
    type Error = RadioFault;

    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Self::Error> {
        self.record(RadioCall::SetActive(active));
        if active && self.fail_activate { Err(RadioFault) } else { Ok(()) }
    }

    fn register_uart_service(&mut self) -> Result<UartHandles, Self::Error> {
        self.record(RadioCall::Register);
        if self.fail_register {
            return Err(RadioFault);
        }
        Ok(UartHandles {
            tx: AttrHandle(Self::TX_HANDLE),
            rx: AttrHandle(Self::RX_HANDLE),
        })
    }

    fn advertise(
        &mut self,
        interval_us: u32,
        _payload: &[u8],
    ) -> Result<(), Self::Error> {
        self.record(RadioCall::Advertise(interval_us));
        if self.fail_advertise { Err(RadioFault) } else { Ok(()) }
    }

    fn notify(
        &mut self,
        conn: ConnHandle,
        attr: AttrHandle,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.record(RadioCall::Notify(conn, attr));
        if self.failing_conn == Some(conn) {
            return Err(RadioFault);
        }
        self.notified.push((conn, data.to_vec()));
        Ok(())
    }
}

// =============================================================================
// CAN
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// Scripted CAN controller: frames queued with [`MockCan::push`] are returned
/// one per `receive`.
#[derive(Debug, Default)]
pub struct MockCan {
    pub rx: VecDeque<CanFrame>,
    pub filter: Option<CanFilter>,
    pub fail_filter: bool,
    /// Fail the next `receive` once.
    pub fail_next_receive: bool,
    pub deinitialized: bool,
}

impl MockCan {
    pub fn new() -> Self { Self::default() }

    pub fn push(
        &mut self,
        frame: CanFrame,
    ) {
        self.rx.push_back(frame);
    }
}

impl CanPeripheral for MockCan {
    type Error = BusFault;

    fn receive(
        &mut self,
        _timeout_ms: u32,
    ) -> Result<Option<CanFrame>, Self::Error> {
        if core::mem::take(&mut self.fail_next_receive) {
            return Err(BusFault);
        }
        Ok(self.rx.pop_front())
    }

    fn set_filter(
        &mut self,
        filter: &CanFilter,
    ) -> Result<(), Self::Error> {
        if self.fail_filter {
            return Err(BusFault);
        }
        self.filter = Some(*filter);
        Ok(())
    }

    fn deinit(&mut self) { self.deinitialized = true; }
}

// =============================================================================
// Display
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFault;

/// Dashboard that records every write and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingDashboard {
    pub texts: Vec<(LabelId, String)>,
    pub colors: Vec<(LabelId, Rgb565)>,
    pub fail: bool,
}

impl RecordingDashboard {
    pub fn new() -> Self { Self::default() }

    /// Most recent text written to `id`.
    pub fn text_of(
        &self,
        id: LabelId,
    ) -> Option<&str> {
        self.texts.iter().rev().find(|(l, _)| *l == id).map(|(_, t)| t.as_str())
    }
}

impl Dashboard for RecordingDashboard {
    type Error = DisplayFault;

    fn set_text(
        &mut self,
        id: LabelId,
        text: &str,
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(DisplayFault);
        }
        self.texts.push((id, text.to_string()));
        Ok(())
    }

    fn set_color(
        &mut self,
        id: LabelId,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(DisplayFault);
        }
        self.colors.push((id, color));
        Ok(())
    }
}
