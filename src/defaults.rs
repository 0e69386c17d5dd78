/// Compiled-in protocol constants and startup defaults.
///
/// ESP-NOW frames are 802.11 vendor-specific action frames stamped with the
/// Espressif OUI. Everything here can be overridden at startup through
/// [`crate::config::PingerConfig`] except the frame layout itself.

use crate::frame::MacAddress;

/// Low byte of the frame control field for a management action frame.
pub const ACTION_SUBTYPE: u8 = 0xD0;

/// Category code carried by vendor-specific action frames.
pub const VENDOR_SPECIFIC_CATEGORY: u8 = 0x7F;

/// Element ID of a vendor-specific information element.
pub const VENDOR_ELEMENT_ID: u8 = 0xDD;

/// Espressif's registered organization identifier.
pub const ESPRESSIF_OUI: [u8; 3] = [0x18, 0xFE, 0x34];

/// Vendor element protocol type for ESP-NOW.
pub const ESP_NOW_TYPE: u8 = 0x04;

/// ESP-NOW protocol version emitted by the radio stack.
pub const ESP_NOW_VERSION: u8 = 0x01;

/// All-ones link address.
pub const BROADCAST_ADDRESS: MacAddress = [0xFF; 6];

/// Fixed identifier this device broadcasts.
pub const DEVICE_ID: MacAddress = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB];

/// Broadcast period. Peers see roughly 100 probes per second.
pub const DEFAULT_TICK_MS: u64 = 10;

/// 2.4 GHz channel shared by every pinger.
pub const DEFAULT_CHANNEL: u8 = 1;

/// ESP-NOW primary master key (16 bytes).
pub const PRIMARY_MASTER_KEY: &[u8; 16] = b"pmk1234567890123";

/// Interval between status reports.
pub const STATUS_INTERVAL_SECS: u64 = 30;
