/// NDJSON device messages.
///
/// Uses `heapless` types and `serde-json-core` so messages can be built in
/// the sniffer callback without an allocator.
use heapless::{String, Vec};
use serde::Serialize;

/// Maximum length for MAC address strings ("aa:bb:cc:dd:ee:ff")
pub type MacString = String<18>;

/// Messages the device writes to its console
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DeviceMessage<'a> {
    /// One accepted ESP-NOW frame
    #[serde(rename = "rssi")]
    Rssi { mac: &'a MacString, rssi: i8 },
    /// Periodic health report
    #[serde(rename = "status")]
    Status {
        /// Uptime in seconds
        uptime: u32,
        /// Broadcast probes attempted
        sent: u32,
        /// Broadcast probes the radio refused
        send_errors: u32,
        /// Samples reported
        samples: u32,
        /// Target chip
        chip: &'static str,
        /// Firmware version
        version: &'static str,
    },
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 160;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;

/// Serialize a DeviceMessage to JSON bytes and write to the output buffer.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_message(msg: &DeviceMessage, buf: &mut [u8]) -> Option<usize> {
    match serde_json_core::to_slice(msg, buf) {
        Ok(len) => {
            // Append newline for NDJSON
            if len < buf.len() {
                buf[len] = b'\n';
                Some(len + 1)
            } else {
                Some(len)
            }
        }
        Err(_) => None,
    }
}

/// Serialize into a fresh [`MsgBuffer`] trimmed to the message length.
pub fn to_msg_buffer(msg: &DeviceMessage) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok()?;
    let len = serialize_message(msg, &mut buf)?;
    buf.truncate(len);
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_rssi_message() {
        let mac = MacString::try_from("7c:df:a1:01:f3:14").unwrap();
        let msg = DeviceMessage::Rssi { mac: &mac, rssi: -47 };
        let mut buf = [0u8; 128];
        let len = serde_json_core::to_slice(&msg, &mut buf).unwrap();
        let json = core::str::from_utf8(&buf[..len]).unwrap();
        assert_eq!(json, r#"{"type":"rssi","mac":"7c:df:a1:01:f3:14","rssi":-47}"#);
    }

    #[test]
    fn serialize_status_message() {
        let msg = DeviceMessage::Status {
            uptime: 120,
            sent: 12000,
            send_errors: 3,
            samples: 4500,
            chip: "esp32s3",
            version: "0.1.0",
        };
        let mut buf = [0u8; 256];
        let len = serde_json_core::to_slice(&msg, &mut buf).unwrap();
        let json = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""uptime":120"#));
        assert!(json.contains(r#""sent":12000"#));
        assert!(json.contains(r#""send_errors":3"#));
        assert!(json.contains(r#""chip":"esp32s3""#));
    }

    #[test]
    fn serialize_appends_newline() {
        let mac = MacString::try_from("00:00:00:00:00:00").unwrap();
        let msg = DeviceMessage::Rssi { mac: &mac, rssi: 0 };
        let mut buf = [0u8; 128];
        let len = serialize_message(&msg, &mut buf).unwrap();
        assert_eq!(buf[len - 1], b'\n');
        assert_eq!(buf[len - 2], b'}');
    }

    #[test]
    fn serialize_fails_on_tiny_buffer() {
        let mac = MacString::try_from("00:00:00:00:00:00").unwrap();
        let msg = DeviceMessage::Rssi { mac: &mac, rssi: 0 };
        let mut buf = [0u8; 8];
        assert!(serialize_message(&msg, &mut buf).is_none());
    }

    #[test]
    fn status_fits_message_buffer() {
        let msg = DeviceMessage::Status {
            uptime: u32::MAX,
            sent: u32::MAX,
            send_errors: u32::MAX,
            samples: u32::MAX,
            chip: "esp32s3",
            version: VERSION,
        };
        let buf = to_msg_buffer(&msg).unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
    }

    #[test]
    fn version_is_semver() {
        let parts: heapless::Vec<&str, 4> = VERSION.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "VERSION should be semver (major.minor.patch)"
        );
        for part in &parts {
            assert!(part.parse::<u32>().is_ok(), "'{part}' is not a number");
        }
    }
}
