//! CYW43 Bluetooth and the trouble-host GATT server.
//!
//! One task owns the host stack. It builds the UART service, publishes its
//! handles for [`ChannelRadio`](canbridge_pico2::radio_link::ChannelRadio)
//! and then works through the request queue: advertise with the payload the
//! bridge built, report connects and disconnects as [`BleEvent`]s and push
//! telemetry notifications to the connected central.
//!
//! The CYW43 firmware blobs are not linked in. Flash them once next to the
//! program:
//!
//! ```bash
//! probe-rs download 43439A0.bin --binary-format bin --chip RP235x --base-address 0x101B0000
//! probe-rs download 43439A0_clm.bin --binary-format bin --chip RP235x --base-address 0x101F0000
//! probe-rs download 43439A0_btfw.bin --binary-format bin --chip RP235x --base-address 0x101F2000
//! ```

use bt_hci::controller::ExternalController;
use canbridge_common::ble::{AttrHandle, BleEvent, BleEventChannel, ConnHandle, MAX_ADV_LEN, UartHandles, post_event};
use canbridge_common::config::{BLE_EVENT_QUEUE_DEPTH, DEVICE_NAME};
use canbridge_common::telemetry::TELEGRAM_LEN;
use canbridge_pico2::radio_link::{REQUEST_QUEUE_DEPTH, RadioRequest, RequestChannel};
use cyw43::bluetooth::BtDriver;
use cyw43_pio::{PioSpi, RM2_CLOCK_DIVIDER};
use defmt::{debug, info, warn};
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_futures::select::{Either, select};
use embassy_rp::Peri;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH1, PIN_23, PIN_24, PIN_25, PIN_29, PIO0};
use embassy_rp::pio::Pio;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use heapless::Vec;
use static_cell::StaticCell;
use trouble_host::prelude::*;

use crate::Irqs;

// Blob locations, see the module docs
const FW_ADDR: usize = 0x101B_0000;
const FW_LEN: usize = 231_077;
const CLM_ADDR: usize = 0x101F_0000;
const CLM_LEN: usize = 984;
const BTFW_ADDR: usize = 0x101F_2000;
const BTFW_LEN: usize = 6164;

/// Max number of connections the host keeps.
const CONNECTIONS_MAX: usize = 1;

/// Max number of L2CAP channels.
const L2CAP_CHANNELS_MAX: usize = 2; // Signal + att

/// Pause before advertising again after the stack reported an error.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HCI command slots for the external controller.
const HCI_SLOTS: usize = 10;

type Controller = ExternalController<BtDriver<'static>, HCI_SLOTS>;

pub type Requests = RequestChannel<CriticalSectionRawMutex, REQUEST_QUEUE_DEPTH>;
pub type Events = BleEventChannel<CriticalSectionRawMutex, BLE_EVENT_QUEUE_DEPTH>;

/// Handles of the UART service, published once the GATT table exists.
pub static UART_HANDLES: Signal<CriticalSectionRawMutex, UartHandles> = Signal::new();

// =============================================================================
// GATT
// =============================================================================

/// Nordic UART Service.
#[gatt_service(uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e")]
struct NordicUartService {
    /// Client writes; the bridge ignores incoming data.
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-e50e24dcca9e", write, write_without_response)]
    rx: heapless08::Vec<u8, TELEGRAM_LEN>,

    /// Telemetry telegrams, one notification each.
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-e50e24dcca9e", notify)]
    tx: heapless08::Vec<u8, TELEGRAM_LEN>,
}

#[gatt_server]
struct Server {
    nus: NordicUartService,
}

// =============================================================================
// Bring-up
// =============================================================================

/// Radio pins and PIO block of the Pico 2 W.
pub struct RadioPins {
    pub pio: Peri<'static, PIO0>,
    pub pwr: Peri<'static, PIN_23>,
    pub cs: Peri<'static, PIN_25>,
    pub dio: Peri<'static, PIN_24>,
    pub clk: Peri<'static, PIN_29>,
    pub dma: Peri<'static, DMA_CH1>,
}

#[embassy_executor::task]
async fn cyw43_task(runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH1>>) -> ! { runner.run().await }

/// Power up the CYW43, load its firmware and start the host task.
pub async fn start(
    spawner: Spawner,
    pins: RadioPins,
    requests: &'static Requests,
    events: &'static Events,
) {
    // SAFETY: the blobs are flashed at these addresses and flash is never written at runtime
    let (fw, clm, btfw) = unsafe {
        (
            core::slice::from_raw_parts(FW_ADDR as *const u8, FW_LEN),
            core::slice::from_raw_parts(CLM_ADDR as *const u8, CLM_LEN),
            core::slice::from_raw_parts(BTFW_ADDR as *const u8, BTFW_LEN),
        )
    };

    let pwr = Output::new(pins.pwr, Level::Low);
    let cs = Output::new(pins.cs, Level::High);
    let mut pio = Pio::new(pins.pio, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        RM2_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        pins.dio,
        pins.clk,
        pins.dma,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (_net_device, bt_device, mut control, runner) = cyw43::new_with_bluetooth(state, pwr, spi, fw, btfw).await;
    spawner.spawn(cyw43_task(runner)).unwrap();
    control.init(clm).await;
    info!("CYW43 up");

    let controller: Controller = ExternalController::new(bt_device);
    spawner.spawn(host_task(controller, requests, events)).unwrap();
}

// =============================================================================
// Host Task
// =============================================================================

/// What the bridge last asked the radio to do.
struct Intent {
    active: bool,
    advertising: Option<(u32, Vec<u8, MAX_ADV_LEN>)>,
}

impl Intent {
    /// Apply a control request. Notifications are returned untouched.
    fn apply(
        &mut self,
        request: RadioRequest,
    ) -> Option<(ConnHandle, Vec<u8, TELEGRAM_LEN>)> {
        match request {
            RadioRequest::SetActive(active) => {
                info!("radio {}", if active { "on" } else { "off" });
                self.active = active;
            }
            RadioRequest::Advertise { interval_us, payload } => self.advertising = Some((interval_us, payload)),
            RadioRequest::Notify { conn, data } => return Some((conn, data)),
        }
        None
    }

    fn advertising(&self) -> Option<(u32, Vec<u8, MAX_ADV_LEN>)> {
        if self.active { self.advertising.clone() } else { None }
    }
}

#[embassy_executor::task]
async fn host_task(
    controller: Controller,
    requests: &'static Requests,
    events: &'static Events,
) {
    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> = HostResources::new();
    let stack = trouble_host::new(controller, &mut resources);
    let Host { mut peripheral, mut runner, .. } = stack.build();

    let server = match Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: DEVICE_NAME,
        appearance: &appearance::sensor::GENERIC_SENSOR,
    })) {
        Ok(server) => server,
        Err(e) => {
            warn!("GATT table setup failed: {}", e);
            return;
        }
    };
    UART_HANDLES.signal(UartHandles {
        tx: AttrHandle(server.nus.tx.handle),
        rx: AttrHandle(server.nus.rx.handle),
    });

    let app = async {
        let mut intent = Intent {
            active: false,
            advertising: None,
        };
        loop {
            let Some((interval_us, payload)) = intent.advertising() else {
                if let Some((conn, _)) = intent.apply(requests.receive().await) {
                    debug!("dropped notify for {}, not advertising", conn.0);
                }
                continue;
            };

            let advertised = select(advertise(&mut peripheral, &server, interval_us, &payload), async {
                // Any control request restarts advertising with the new intent
                while intent.apply(requests.receive().await).is_some() {}
            })
            .await;

            let conn = match advertised {
                Either::First(Ok(conn)) => conn,
                Either::First(Err(e)) => {
                    warn!("advertising failed: {}", e);
                    Timer::after(RETRY_DELAY).await;
                    continue;
                }
                Either::Second(()) => continue,
            };

            let handle = ConnHandle(conn.raw().handle().raw());
            info!("central connected: {}", handle.0);
            post_event(events, BleEvent::Connected(handle));

            select(gatt_events(&conn), serve(&server, &conn, handle, requests, &mut intent)).await;

            info!("central disconnected: {}", handle.0);
            post_event(events, BleEvent::Disconnected(handle));
        }
    };

    if let (Err(e), _) = join(runner.run(), app).await {
        warn!("BLE host stopped: {}", e);
    }
}

/// Advertise until a central connects.
async fn advertise<'values, 'server, C: trouble_host::Controller>(
    peripheral: &mut Peripheral<'values, C, DefaultPacketPool>,
    server: &'server Server<'values>,
    interval_us: u32,
    payload: &[u8],
) -> Result<GattConnection<'values, 'server, DefaultPacketPool>, BleHostError<C::Error>> {
    let interval = Duration::from_micros(u64::from(interval_us));
    let params = AdvertisementParameters {
        interval_min: interval,
        interval_max: interval,
        ..Default::default()
    };
    let advertiser = peripheral
        .advertise(&params, Advertisement::ConnectableScannableUndirected {
            adv_data: payload,
            scan_data: &[],
        })
        .await?;
    let conn = advertiser.accept().await?.with_attribute_server(server)?;
    Ok(conn)
}

/// Answer GATT requests until the central goes away.
async fn gatt_events(conn: &GattConnection<'_, '_, DefaultPacketPool>) {
    let reason = loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => break reason,
            GattConnectionEvent::Gatt { event } => {
                if let GattEvent::Write(write) = &event {
                    debug!("RX write, {} bytes ignored", write.data().len());
                }
                match event.accept() {
                    Ok(reply) => reply.send().await,
                    Err(e) => warn!("GATT reply failed: {}", e),
                }
            }
            _ => {}
        }
    };
    debug!("disconnect reason: {}", reason);
}

/// Push queued notifications to the connected central.
async fn serve(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, DefaultPacketPool>,
    handle: ConnHandle,
    requests: &Requests,
    intent: &mut Intent,
) {
    loop {
        let Some((target, data)) = intent.apply(requests.receive().await) else {
            if !intent.active {
                conn.raw().disconnect();
            }
            continue;
        };
        if target != handle {
            debug!("dropped notify for stale connection {}", target.0);
            continue;
        }
        let mut value = heapless08::Vec::<u8, TELEGRAM_LEN>::new();
        // Both buffers are TELEGRAM_LEN long
        let _ = value.extend_from_slice(&data);
        if let Err(e) = server.nus.tx.notify(conn, &value).await {
            warn!("notify failed: {}", e);
        }
    }
}
