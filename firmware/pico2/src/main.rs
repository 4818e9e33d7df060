//! CAN to BLE telemetry bridge firmware for the Raspberry Pi Pico 2 W.
//!
//! Engine frames arrive from an SLCAN adapter on UART1, the ST7789 panel
//! (Pimoroni PIM715) shows the live gauges and link state, and a BLE UART
//! peripheral streams a compact telemetry telegram to connected centrals.
//!
//! # Tasks
//!
//! - **main:** runs the bridge tick every `LOOP_PERIOD_MS` and repaints dirty labels
//! - **host:** trouble-host GATT server, advertising and notifications (`ble` feature)
//! - **cyw43:** radio chip driver (`ble` feature)
//!
//! The main loop never waits on the radio: BLE requests go through
//! `RADIO_REQUESTS` and connection events come back through `BLE_EVENTS`.

#![no_std]
#![no_main]
// Crate-level lints (match lib.rs for consistency)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// Modules only used in the binary (not testable on host)
#[cfg(feature = "ble")]
mod ble;
mod panel;
mod st7789;

use canbridge_common::ble::{BleEventChannel, UartHandles};
use canbridge_common::config::{BLE_EVENT_QUEUE_DEPTH, CAN_BITRATE, LOOP_PERIOD_MS};
use canbridge_common::debug_log::EventLog;
use canbridge_common::{Bridge, BridgeConfig, LabelBoard};
use canbridge_pico2::radio_link::{ChannelRadio, REQUEST_QUEUE_DEPTH, RequestChannel};
use canbridge_pico2::slcan_port::{SLCAN_BAUD, SlcanPort};
use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{PIO0, UART1};
use embassy_rp::spi::Spi;
use embassy_rp::uart::{self, BufferedInterruptHandler, BufferedUart};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, Ticker};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::panel::Panel;
use crate::st7789::{St7789, spi_config};

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

// =============================================================================
// Shared Queues
// =============================================================================

/// Connection events from the BLE host task, drained by the bridge each tick.
static BLE_EVENTS: BleEventChannel<CriticalSectionRawMutex, BLE_EVENT_QUEUE_DEPTH> = BleEventChannel::new();

/// Radio requests from the bridge to the BLE host task.
static RADIO_REQUESTS: RequestChannel<CriticalSectionRawMutex, REQUEST_QUEUE_DEPTH> = RequestChannel::new();

/// How long to wait for the GATT table before running without BLE.
#[cfg(feature = "ble")]
const RADIO_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

const UART_BUFFER_SIZE: usize = 256;

type Radio = ChannelRadio<'static, CriticalSectionRawMutex, REQUEST_QUEUE_DEPTH>;

// Program metadata for `picotool info`
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"canbridge-pico2"),
    embassy_rp::binary_info::rp_program_description!(c"CAN to BLE telemetry bridge with PIM715 display"),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

/// Bring up the radio and hand back the handles of its UART service.
#[cfg(feature = "ble")]
async fn bring_up_radio(
    spawner: Spawner,
    pins: ble::RadioPins,
) -> Option<UartHandles> {
    ble::start(spawner, pins, &RADIO_REQUESTS, &BLE_EVENTS).await;
    match embassy_time::with_timeout(RADIO_STARTUP_TIMEOUT, ble::UART_HANDLES.wait()).await {
        Ok(handles) => Some(handles),
        Err(_) => {
            warn!("BLE host did not come up");
            None
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("CAN bridge starting...");
    let p = embassy_rp::init(Default::default());

    // Initialize display pins
    // PIM715 pinout: CS=17, DC=16, CLK=18, MOSI=19, Backlight=20
    let cs = Output::new(p.PIN_17, Level::High);
    let dc = Output::new(p.PIN_16, Level::Low);
    let _backlight = Output::new(p.PIN_20, Level::High);

    // Async SPI with DMA (TX-only, display doesn't need MISO)
    let spi = Spi::new_txonly(p.SPI0, p.PIN_18, p.PIN_19, p.DMA_CH0, spi_config());
    let mut lcd = St7789::new(spi, dc, cs);
    if let Err(e) = lcd.init().await {
        error!("display init failed: {}", e);
        halt();
    }
    let mut panel = Panel::new(lcd);
    if let Err(e) = panel.draw_static().await {
        error!("display init failed: {}", e);
        halt();
    }
    info!("Display initialized");

    let mut board = LabelBoard::new();
    let mut bridge = Bridge::new(BridgeConfig::DEFAULT);

    #[cfg(feature = "ble")]
    let handles = bring_up_radio(spawner, ble::RadioPins {
        pio: p.PIO0,
        pwr: p.PIN_23,
        cs: p.PIN_25,
        dio: p.PIN_24,
        clk: p.PIN_29,
        dma: p.DMA_CH1,
    })
    .await;
    #[cfg(not(feature = "ble"))]
    let handles: Option<UartHandles> = {
        let _ = spawner;
        None
    };

    let radio: Option<Radio> = handles.map(|handles| ChannelRadio::new(&RADIO_REQUESTS, handles));
    if let Err(e) = bridge.start_ble(radio, &mut board) {
        error!("BLE start failed: {}", e);
    }

    // SLCAN adapter on UART1 (TX=GPIO4, RX=GPIO5)
    static TX_BUF: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
    static RX_BUF: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = SLCAN_BAUD;
    let uart = BufferedUart::new(
        p.UART1,
        p.PIN_4,
        p.PIN_5,
        Irqs,
        TX_BUF.init([0; UART_BUFFER_SIZE]),
        RX_BUF.init([0; UART_BUFFER_SIZE]),
        uart_config,
    );
    if let Err(e) = bridge.start_can(SlcanPort::open(uart, CAN_BITRATE), &mut board) {
        error!("CAN start failed: {}", e);
    }

    info!("Main loop starting");
    let mut log = EventLog::new();
    let mut ticker = Ticker::every(Duration::from_millis(LOOP_PERIOD_MS));
    loop {
        let now_ms = Instant::now().as_millis();
        match bridge.tick(now_ms, &BLE_EVENTS, &mut board) {
            Ok(report) => {
                let added = log.record(now_ms, &report);
                for line in log.iter().skip(log.len() - added) {
                    info!("{}", line);
                }
            }
            Err(e) => {
                error!("bridge tick failed: {}", e);
                break;
            }
        }
        if let Err(e) = panel.flush(&mut board).await {
            error!("display flush failed: {}", e);
            break;
        }
        ticker.next().await;
    }

    bridge.shutdown();
    halt();
}

/// Park the core after a fatal error; the bridge has already been shut down.
fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
