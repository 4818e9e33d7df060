//! Scripted ECU and BLE centrals.
//!
//! Sensor values follow slow sine waves like a car idling and revving. They
//! are packed into the two tracked frames and serialized as SLCAN records, the
//! byte stream a serial CAN adapter would deliver.

use std::fmt::Write as _;

use canbridge_common::ble::{BleEvent, ConnHandle};
use canbridge_common::config::{ELECTRICAL_FRAME_ID, ENGINE_FRAME_ID};

use crate::timing::{BUS_START_MS, DROPOUT_MS, FRAME_PERIOD_MS};

/// Untracked identifier the acceptance filter must drop.
const NOISE_FRAME_ID: u32 = 0x100;

/// Up to two central events can fall on one tick.
pub type CentralEvents = heapless::Vec<BleEvent, 2>;

pub struct EcuScript {
    noise_sent: u64,
}

impl EcuScript {
    pub const fn new() -> Self { Self { noise_sent: 0 } }

    /// SLCAN bytes the adapter receives during the tick at `now_ms`.
    pub fn bus_traffic(
        &mut self,
        now_ms: u64,
    ) -> Option<String> {
        if now_ms < BUS_START_MS || (DROPOUT_MS.0..DROPOUT_MS.1).contains(&now_ms) {
            return None;
        }
        if !now_ms.is_multiple_of(FRAME_PERIOD_MS) {
            return None;
        }

        let t = now_ms as f32 / 1000.0;
        let iat = fake_signal(t, 20.0, 55.0, 0.2) as u16;
        let rpm = fake_signal(t, 850.0, 6200.0, 0.9) as u16;
        let map_raw = fake_signal(t, 130.0, 290.0, 0.9) as u16;
        let afr_tenths = fake_signal(t, 115.0, 165.0, 0.5) as u16;
        let volt_centi = fake_signal(t, 1240.0, 1440.0, 0.15) as u16;
        let egt = fake_signal(t, 320.0, 880.0, 0.3) as u16;

        let mut out = String::new();
        push_record(&mut out, ENGINE_FRAME_ID, [iat, rpm, map_raw]);
        push_record(&mut out, ELECTRICAL_FRAME_ID, [afr_tenths, volt_centi, egt]);
        if now_ms - self.noise_sent >= 500 {
            self.noise_sent = now_ms;
            push_record(&mut out, NOISE_FRAME_ID, [0xDEAD, 0xBEEF, 0]);
        }
        Some(out)
    }

    /// Centrals connecting and leaving at `now_ms`.
    pub fn central_events(now_ms: u64) -> CentralEvents {
        let mut events = CentralEvents::new();
        // Never more than two per tick
        match now_ms {
            300 => events.push(BleEvent::Connected(ConnHandle(1))).ok(),
            6_500 => events.push(BleEvent::Connected(ConnHandle(2))).ok(),
            7_000 => events.push(BleEvent::Disconnected(ConnHandle(1))).ok(),
            _ => None,
        };
        events
    }
}

/// `t<id><dlc><data>\r` with three big-endian words and two zero bytes.
fn push_record(
    out: &mut String,
    id: u32,
    words: [u16; 3],
) {
    let _ = write!(out, "t{id:03X}8");
    for word in words {
        let _ = write!(out, "{word:04X}");
    }
    out.push_str("0000\r");
}

fn fake_signal(
    t: f32,
    min: f32,
    max: f32,
    freq: f32,
) -> f32 {
    let normalized = (t * freq).sin().mul_add(0.5, 0.5);
    min + normalized * (max - min)
}
