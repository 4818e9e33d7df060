//! Host simulator for the CAN to BLE telemetry bridge.
//!
//! Replays a scripted session through the same [`Bridge`] the firmware runs:
//! an ECU streams SLCAN records, a central connects, the bus drops out for two
//! seconds and comes back, a second central joins and the first leaves. Label
//! changes and telemetry notifications are printed as they happen.
//!
//! ```text
//! simulator [--realtime] [--png <path>]
//! ```
//!
//! `--realtime` paces ticks at the firmware loop period; `--png` saves the
//! final panel.

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod console_radio;
mod ecu;
mod panel;
mod sim_can;
mod timing;

use std::convert::Infallible;
use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use canbridge_common::ble::{BleEventChannel, post_event};
use canbridge_common::config::{BLE_EVENT_QUEUE_DEPTH, LOOP_PERIOD_MS};
use canbridge_common::debug_log::EventLog;
use canbridge_common::{Bridge, BridgeConfig, LabelBoard};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use crate::console_radio::ConsoleRadio;
use crate::ecu::EcuScript;
use crate::panel::SimPanel;
use crate::sim_can::SimCan;
use crate::timing::{SESSION_MS, TICK_TIME};

#[derive(Debug, Default)]
struct Options {
    realtime: bool,
    png: Option<PathBuf>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--realtime" => options.realtime = true,
                "--png" => options.png = Some(args.next().ok_or("--png needs a path")?.into()),
                other => return Err(format!("unknown argument {other}")),
            }
        }
        Ok(options)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::parse(std::env::args().skip(1))?;

    let events: BleEventChannel<NoopRawMutex, BLE_EVENT_QUEUE_DEPTH> = BleEventChannel::new();
    let mut board = LabelBoard::new();
    let mut panel = SimPanel::new();
    let mut log = EventLog::new();
    let mut ecu = EcuScript::new();

    panel.flush(0, &mut board);

    let mut bridge: Bridge<SimCan, ConsoleRadio> = Bridge::new(BridgeConfig::DEFAULT);
    bridge.start_ble(Some(ConsoleRadio::new()), &mut board)?;
    bridge.start_can(Ok::<_, Infallible>(SimCan::new()), &mut board)?;

    let mut now_ms = 0;
    while now_ms <= SESSION_MS {
        let tick_start = Instant::now();

        for event in EcuScript::central_events(now_ms) {
            post_event(&events, event);
        }
        if let Some(records) = ecu.bus_traffic(now_ms)
            && let Some(can) = bridge.can_mut()
        {
            can.feed(records.as_bytes());
        }

        let report = bridge.tick(now_ms, &events, &mut board)?;
        log.record(now_ms, &report);
        panel.flush(now_ms, &mut board);

        if options.realtime
            && let Some(rest) = TICK_TIME.checked_sub(tick_start.elapsed())
        {
            thread::sleep(rest);
        }
        now_ms += LOOP_PERIOD_MS;
    }

    let notifications = bridge.ble().map_or(0, |ble| ble.radio().notifications());
    let filtered = bridge.can().map_or(0, SimCan::dropped);
    bridge.shutdown();

    println!();
    println!("{notifications} notifications sent, {filtered} foreign frames filtered");
    println!("event log:");
    for line in log.iter() {
        println!("  {line}");
    }

    if let Some(path) = options.png {
        panel.save_png(&path)?;
        println!("panel saved to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> { list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>().into_iter() }

    #[test]
    fn test_parse_defaults() {
        let options = Options::parse(args(&[])).unwrap();
        assert!(!options.realtime);
        assert!(options.png.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let options = Options::parse(args(&["--realtime", "--png", "out.png"])).unwrap();
        assert!(options.realtime);
        assert_eq!(options.png, Some(PathBuf::from("out.png")));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(Options::parse(args(&["--fast"])).is_err());
        assert!(Options::parse(args(&["--png"])).is_err());
    }

    #[test]
    fn test_session_goes_online_and_back() {
        let events: BleEventChannel<NoopRawMutex, 8> = BleEventChannel::new();
        let mut board = LabelBoard::new();
        let mut log = EventLog::new();
        let mut ecu = EcuScript::new();
        let mut bridge: Bridge<SimCan, ConsoleRadio> = Bridge::new(BridgeConfig::DEFAULT);
        bridge.start_ble(Some(ConsoleRadio::new()), &mut board).unwrap();
        bridge.start_can(Ok::<_, Infallible>(SimCan::new()), &mut board).unwrap();

        let mut now_ms = 0;
        while now_ms <= SESSION_MS {
            for event in EcuScript::central_events(now_ms) {
                post_event(&events, event);
            }
            if let Some(records) = ecu.bus_traffic(now_ms) {
                bridge.can_mut().unwrap().feed(records.as_bytes());
            }
            let report = bridge.tick(now_ms, &events, &mut board).unwrap();
            log.record(now_ms, &report);
            now_ms += LOOP_PERIOD_MS;
        }

        let lines: Vec<&str> = log.iter().collect();
        assert_eq!(lines, ["[0.500] link ONLINE", "[5.490] link OFF", "[6.000] link ONLINE"]);
        assert!(bridge.can().unwrap().dropped() > 0);
        assert!(bridge.ble().unwrap().radio().notifications() > 0);
    }
}
