//! RSSI pinger, ESP-IDF std firmware
//!
//! Thread-based counterpart of the Embassy firmware. The promiscuous
//! callback classifies and prints in the WiFi driver task; the main thread
//! runs the broadcast loop; a status thread reports counters.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use esp_idf_svc::espnow::{EspNow, PeerInfo};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{
    esp, esp_now_set_pmk, esp_wifi_set_channel, esp_wifi_set_promiscuous,
    esp_wifi_set_promiscuous_rx_cb, esp_wifi_set_protocol, esp_wifi_set_storage,
    wifi_interface_t_WIFI_IF_STA, wifi_promiscuous_pkt_t, wifi_promiscuous_pkt_type_t,
    wifi_second_chan_t_WIFI_SECOND_CHAN_NONE, wifi_storage_t_WIFI_STORAGE_RAM, EspError,
    WIFI_PROTOCOL_11B, WIFI_PROTOCOL_11G, WIFI_PROTOCOL_11N, WIFI_PROTOCOL_LR,
};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use rssi_pinger::classifier::{classify, VendorMarker};
use rssi_pinger::config::PingerConfig;
use rssi_pinger::defaults;
use rssi_pinger::frame::{CaptureMetadata, MacAddress, PacketKind};
use rssi_pinger::protocol::{self, DeviceMessage, VERSION};
use rssi_pinger::reporter::{ReportFormat, RssiReporter};
use rssi_pinger::scheduler::{BroadcastProbe, BroadcastScheduler, FrameSender};

// ── Shared state ─────────────────────────────────────────────────────

/// What the promiscuous callback needs from the startup config.
struct CaptureConfig {
    marker: VendorMarker,
    format: ReportFormat,
}

/// Set once before the callback is registered.
static CAPTURE_CONFIG: OnceLock<CaptureConfig> = OnceLock::new();

/// The send counters mirror the scheduler's own after every tick.
static SAMPLE_COUNT: AtomicU32 = AtomicU32::new(0);
static SENT_COUNT: AtomicU32 = AtomicU32::new(0);
static SEND_ERROR_COUNT: AtomicU32 = AtomicU32::new(0);

// ── WiFi promiscuous callback ────────────────────────────────────────

fn stdout_sink(line: &str) {
    println!("{}", line);
}

/// WiFi promiscuous mode callback.
///
/// Runs in the WiFi driver task context (not ISR on ESP-IDF, but still
/// must be non-blocking).
unsafe extern "C" fn promisc_rx_cb(buf: *mut c_void, pkt_type: wifi_promiscuous_pkt_type_t) {
    let Some(capture) = CAPTURE_CONFIG.get() else {
        return;
    };

    let pkt = unsafe { &*(buf as *const wifi_promiscuous_pkt_t) };
    let sig_len = pkt.rx_ctrl.sig_len() as usize;
    if sig_len == 0 {
        return;
    }

    // Safety: payload is `sig_len` bytes starting at pkt.payload
    let frame = unsafe { std::slice::from_raw_parts(pkt.payload.as_ptr(), sig_len) };

    let meta = CaptureMetadata {
        kind: PacketKind::from_promiscuous_type(pkt_type),
        rssi: pkt.rx_ctrl.rssi() as i8,
    };
    if let Some(sample) = classify(frame, &meta, &capture.marker).sample() {
        SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
        RssiReporter::new(stdout_sink, capture.format).report(&sample);
    }
}

// ── ESP-NOW sender ───────────────────────────────────────────────────

struct EspNowSender(EspNow<'static>);

impl FrameSender for EspNowSender {
    type Error = EspError;

    fn send_frame(&mut self, destination: &MacAddress, payload: &[u8]) -> Result<(), EspError> {
        self.0.send(*destination, payload)
    }
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();

    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    let boot = Instant::now();

    log::info!("RSSI pinger v{} starting on {} (std)", VERSION, rssi_pinger::CHIP);

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
        .map_err(|e| anyhow::anyhow!("build-time config: {}", e))?;

    CAPTURE_CONFIG
        .set(CaptureConfig {
            marker: config.marker,
            format: config.report_format,
        })
        .map_err(|_| anyhow::anyhow!("capture config already set"))?;

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    // Erases and re-initializes a full or outdated partition.
    let nvs = EspDefaultNvsPartition::take()?;

    // ── WiFi (station, RAM storage) ──────────────────────────────────

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    unsafe {
        esp!(esp_wifi_set_storage(wifi_storage_t_WIFI_STORAGE_RAM))?;
    }
    wifi.set_configuration(&esp_idf_svc::wifi::Configuration::Client(Default::default()))?;
    wifi.start()?;

    unsafe {
        esp!(esp_wifi_set_promiscuous(true))?;
        esp!(esp_wifi_set_promiscuous_rx_cb(Some(promisc_rx_cb)))?;
        esp!(esp_wifi_set_channel(
            config.channel,
            wifi_second_chan_t_WIFI_SECOND_CHAN_NONE
        ))?;
    }
    log::info!("WiFi sniffer initialized in promiscuous mode on channel {}", config.channel);

    if config.long_range {
        let protocols =
            WIFI_PROTOCOL_11B | WIFI_PROTOCOL_11G | WIFI_PROTOCOL_11N | WIFI_PROTOCOL_LR;
        unsafe {
            esp!(esp_wifi_set_protocol(wifi_interface_t_WIFI_IF_STA, protocols as u8))?;
        }
        log::info!("Long-range mode enabled");
    }

    // ── ESP-NOW ──────────────────────────────────────────────────────

    let esp_now = EspNow::take()?;
    unsafe {
        esp!(esp_now_set_pmk(defaults::PRIMARY_MASTER_KEY.as_ptr()))?;
    }
    esp_now.add_peer(PeerInfo {
        peer_addr: config.broadcast,
        channel: config.channel,
        ifidx: wifi_interface_t_WIFI_IF_STA,
        encrypt: false,
        ..Default::default()
    })?;
    log::info!("Broadcast peer registered");

    // ── Status thread ────────────────────────────────────────────────

    thread::Builder::new()
        .name("status".into())
        .stack_size(4096)
        .spawn(move || status_thread(boot))?;

    let scheduler = BroadcastScheduler::new(
        EspNowSender(esp_now),
        BroadcastProbe::new(config.broadcast, config.device_id),
        config.tick_ms,
    );

    broadcast_loop(scheduler)
}

// ── Broadcast loop ───────────────────────────────────────────────────

/// One probe per tick at absolute deadlines; a late tick fires at once
/// instead of pushing the schedule back.
fn broadcast_loop(mut scheduler: BroadcastScheduler<EspNowSender>) -> ! {
    log::info!("Broadcasting every {} ms", scheduler.period_ms());

    let period = Duration::from_millis(scheduler.period_ms());
    let mut next_wake = Instant::now() + period;

    loop {
        let now = Instant::now();
        if next_wake > now {
            thread::sleep(next_wake - now);
        }
        next_wake += period;

        scheduler.tick();
        SENT_COUNT.store(scheduler.attempts(), Ordering::Relaxed);
        SEND_ERROR_COUNT.store(scheduler.failures(), Ordering::Relaxed);
    }
}

// ── Status thread ────────────────────────────────────────────────────

fn status_thread(boot: Instant) {
    loop {
        thread::sleep(Duration::from_secs(defaults::STATUS_INTERVAL_SECS));

        let msg = DeviceMessage::Status {
            uptime: boot.elapsed().as_secs() as u32,
            sent: SENT_COUNT.load(Ordering::Relaxed),
            send_errors: SEND_ERROR_COUNT.load(Ordering::Relaxed),
            samples: SAMPLE_COUNT.load(Ordering::Relaxed),
            chip: rssi_pinger::CHIP,
            version: VERSION,
        };

        if let Some(buf) = protocol::to_msg_buffer(&msg) {
            if let Ok(s) = std::str::from_utf8(&buf) {
                log::info!("{}", s.trim_end());
            }
        }
    }
}
