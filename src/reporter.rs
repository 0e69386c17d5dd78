/// Sample reporting.
///
/// Formats each accepted [`RssiSample`] and hands the line to a sink. The
/// sink owns delivery; the reporter never buffers, filters or fails.

use core::fmt::Write;

use heapless::String;

use crate::classifier::RssiSample;
use crate::frame::MacAddress;
use crate::protocol::{serialize_message, DeviceMessage, MacString, MAX_MSG_LEN};

/// "aa:bb:cc:dd:ee:ff -128"
pub type SampleLine = String<24>;

/// Output line shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// `<mac> <rssi>`
    Plain,
    /// One `rssi` device message per line
    Ndjson,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Plain => "plain",
            ReportFormat::Ndjson => "ndjson",
        }
    }
}

/// Destination for formatted lines. Must be safe to call from the capture
/// context.
pub trait ReportSink {
    fn emit(&self, line: &str);
}

impl<F: Fn(&str)> ReportSink for F {
    fn emit(&self, line: &str) {
        self(line)
    }
}

/// Format a 6-byte MAC address into "aa:bb:cc:dd:ee:ff"
pub fn format_mac(mac: &MacAddress, buf: &mut MacString) {
    let _ = write!(
        buf,
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
}

/// Format a sample as `<mac> <rssi>`.
pub fn format_sample(sample: &RssiSample) -> SampleLine {
    let mut mac = MacString::new();
    format_mac(&sample.peer_address, &mut mac);
    let mut line = SampleLine::new();
    let _ = write!(line, "{} {}", mac, sample.rssi);
    line
}

pub struct RssiReporter<S> {
    sink: S,
    format: ReportFormat,
}

impl<S: ReportSink> RssiReporter<S> {
    pub const fn new(sink: S, format: ReportFormat) -> Self {
        Self { sink, format }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Emit one sample. Called once per accepted frame.
    pub fn report(&self, sample: &RssiSample) {
        match self.format {
            ReportFormat::Plain => self.sink.emit(&format_sample(sample)),
            ReportFormat::Ndjson => {
                let mut mac = MacString::new();
                format_mac(&sample.peer_address, &mut mac);
                let msg = DeviceMessage::Rssi {
                    mac: &mac,
                    rssi: sample.rssi,
                };
                let mut buf = [0u8; MAX_MSG_LEN];
                if let Some(len) = serialize_message(&msg, &mut buf) {
                    if let Ok(s) = core::str::from_utf8(&buf[..len]) {
                        self.sink.emit(s.trim_end());
                    }
                }
            }
        }
    }
}
