//! RSSI pinger, Embassy firmware
//!
//! Broadcasts an ESP-NOW probe every tick and sniffs the channel in
//! promiscuous mode, printing `<peer mac> <rssi>` for every ESP-NOW frame
//! heard from other pingers.

#![no_std]
#![no_main]

use esp_backtrace as _;

esp_bootloader_esp_idf::esp_app_desc!();

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};
use critical_section::Mutex;
use embassy_time::{Duration, Instant, Ticker, Timer};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::esp_now::{EspNow, EspNowError, EspNowWifiInterface, PeerInfo};
use esp_radio::wifi::sniffer::PromiscuousPkt;

use rssi_pinger::classifier::{classify, VendorMarker};
use rssi_pinger::config::PingerConfig;
use rssi_pinger::defaults;
use rssi_pinger::frame::{CaptureMetadata, MacAddress, PacketKind};
use rssi_pinger::protocol::{self, DeviceMessage, VERSION};
use rssi_pinger::reporter::{ReportFormat, RssiReporter};
use rssi_pinger::scheduler::{AsyncFrameSender, BroadcastProbe, BroadcastScheduler};

// ── Shared state ─────────────────────────────────────────────────────

/// What the sniffer callback needs from the startup config.
#[derive(Clone, Copy)]
struct CaptureConfig {
    marker: VendorMarker,
    format: ReportFormat,
}

/// Written once in `main` before promiscuous mode is enabled.
static CAPTURE_CONFIG: Mutex<Cell<CaptureConfig>> = Mutex::new(Cell::new(CaptureConfig {
    marker: VendorMarker::ESP_NOW,
    format: ReportFormat::Plain,
}));

/// Counters for the status report. The send counters mirror the
/// scheduler's own after every tick.
static SAMPLE_COUNT: AtomicU32 = AtomicU32::new(0);
static SENT_COUNT: AtomicU32 = AtomicU32::new(0);
static SEND_ERROR_COUNT: AtomicU32 = AtomicU32::new(0);

// ── Capture path ─────────────────────────────────────────────────────

fn serial_sink(line: &str) {
    esp_println::println!("{}", line);
}

/// WiFi sniffer callback: called from ISR context by the esp-radio sniffer.
///
/// Classifies the frame and prints accepted samples straight away. Nothing
/// here blocks or allocates.
fn sniffer_callback(pkt: PromiscuousPkt<'_>) {
    let capture = critical_section::with(|cs| CAPTURE_CONFIG.borrow(cs).get());
    let meta = CaptureMetadata {
        kind: PacketKind::from_promiscuous_type(pkt.frame_type as u32),
        rssi: pkt.rx_cntl.rssi as i8,
    };
    if let Some(sample) = classify(pkt.data, &meta, &capture.marker).sample() {
        SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
        RssiReporter::new(serial_sink, capture.format).report(&sample);
    }
}

// ── Broadcast path ───────────────────────────────────────────────────

struct EspNowSender(EspNow<'static>);

impl AsyncFrameSender for EspNowSender {
    type Error = EspNowError;

    /// Resolves when the driver's send callback fires. The task yields
    /// meanwhile instead of spinning on it.
    async fn send_frame(&mut self, destination: &MacAddress, payload: &[u8]) -> Result<(), EspNowError> {
        self.0.send_async(destination, payload).await
    }
}

/// Broadcast task: one probe per tick, at absolute tick boundaries.
#[embassy_executor::task]
async fn broadcast_task(mut scheduler: BroadcastScheduler<EspNowSender>) {
    log::info!("Broadcasting every {} ms", scheduler.period_ms());

    let mut ticker = Ticker::every(Duration::from_millis(scheduler.period_ms()));
    loop {
        ticker.next().await;
        scheduler.tick_async().await;
        SENT_COUNT.store(scheduler.attempts(), Ordering::Relaxed);
        SEND_ERROR_COUNT.store(scheduler.failures(), Ordering::Relaxed);
    }
}

// FFI binding for the WiFi protocol bitmap.
// The symbol is linked via esp-radio's WiFi driver.
unsafe extern "C" {
    fn esp_wifi_set_protocol(ifx: u32, protocol_bitmap: u8) -> i32;
}

const WIFI_IF_STA: u32 = 0;
const WIFI_PROTOCOL_11B: u8 = 0x1;
const WIFI_PROTOCOL_11G: u8 = 0x2;
const WIFI_PROTOCOL_11N: u8 = 0x4;
const WIFI_PROTOCOL_LR: u8 = 0x8;

// ── Entry point ──────────────────────────────────────────────────────

#[esp_rtos::main]
async fn main(spawner: embassy_executor::Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(size: 72 * 1024);

    // Start the RTOS: requires timer + software interrupt
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log::info!("RSSI pinger v{} starting on {}", VERSION, rssi_pinger::CHIP);

    let mut config = PingerConfig::new();
    config
        .apply_overrides(&[
            ("device_id", option_env!("PINGER_DEVICE_ID")),
            ("broadcast", option_env!("PINGER_BROADCAST")),
            ("tick_ms", option_env!("PINGER_TICK_MS")),
            ("channel", option_env!("PINGER_CHANNEL")),
            ("long_range", option_env!("PINGER_LONG_RANGE")),
            ("format", option_env!("PINGER_FORMAT")),
        ])
        .expect("Invalid build-time config");

    log::info!(
        "Marker: OUI {:02x}:{:02x}:{:02x} type {:#04x} v{}, channel {}, format {}",
        config.marker.oui[0],
        config.marker.oui[1],
        config.marker.oui[2],
        config.marker.protocol_type,
        config.marker.protocol_version,
        config.channel,
        config.report_format.as_str(),
    );

    critical_section::with(|cs| {
        CAPTURE_CONFIG.borrow(cs).set(CaptureConfig {
            marker: config.marker,
            format: config.report_format,
        })
    });

    // ── WiFi + ESP-NOW initialization ──────────────────────────────────

    let (mut wifi_controller, wifi_interfaces) =
        esp_radio::wifi::new(peripherals.WIFI, Default::default()).expect("WiFi init failed");

    wifi_controller
        .set_config(&esp_radio::wifi::ModeConfig::Client(Default::default()))
        .expect("WiFi station mode failed");
    wifi_controller.start().expect("WiFi start failed");

    if config.long_range {
        let protocols = WIFI_PROTOCOL_11B | WIFI_PROTOCOL_11G | WIFI_PROTOCOL_11N | WIFI_PROTOCOL_LR;
        let rc = unsafe { esp_wifi_set_protocol(WIFI_IF_STA, protocols) };
        if rc != 0 {
            panic!("Long-range protocol failed: {}", rc);
        }
        log::info!("Long-range mode enabled");
    }

    // esp-radio registers ff:ff:ff:ff:ff:ff itself; any other destination
    // needs a peer entry.
    let esp_now = wifi_interfaces.esp_now;
    esp_now
        .set_channel(config.channel)
        .expect("ESP-NOW channel failed");
    esp_now
        .set_pmk(defaults::PRIMARY_MASTER_KEY)
        .expect("ESP-NOW PMK failed");
    if !esp_now.peer_exists(&config.broadcast) {
        esp_now
            .add_peer(PeerInfo {
                interface: EspNowWifiInterface::Sta,
                peer_address: config.broadcast,
                lmk: None,
                channel: None,
                encrypt: false,
            })
            .expect("ESP-NOW peer failed");
    }

    let mut sniffer = wifi_interfaces.sniffer;
    sniffer.set_receive_cb(sniffer_callback);
    sniffer
        .set_promiscuous_mode(true)
        .expect("Promiscuous mode failed");

    log::info!("WiFi sniffer initialized in promiscuous mode");

    let scheduler = BroadcastScheduler::new(
        EspNowSender(esp_now),
        BroadcastProbe::new(config.broadcast, config.device_id),
        config.tick_ms,
    );
    spawner.spawn(broadcast_task(scheduler)).unwrap();

    // ── Status reporting ───────────────────────────────────────────────
    //
    // The WiFi controller must outlive the sniffer and ESP-NOW, so main
    // never returns.

    loop {
        Timer::after(Duration::from_secs(defaults::STATUS_INTERVAL_SECS)).await;

        let msg = DeviceMessage::Status {
            uptime: (Instant::now().as_millis() / 1000) as u32,
            sent: SENT_COUNT.load(Ordering::Relaxed),
            send_errors: SEND_ERROR_COUNT.load(Ordering::Relaxed),
            samples: SAMPLE_COUNT.load(Ordering::Relaxed),
            chip: rssi_pinger::CHIP,
            version: VERSION,
        };

        if let Some(buf) = protocol::to_msg_buffer(&msg) {
            if let Ok(s) = core::str::from_utf8(&buf) {
                log::info!("{}", s.trim_end());
            }
        }
    }
}
