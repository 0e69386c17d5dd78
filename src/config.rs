/// Startup configuration.
///
/// Built once from compiled-in defaults, optionally adjusted with key/value
/// overrides before the radio starts, then read-only for the lifetime of
/// the firmware.

use core::fmt;

use crate::classifier::VendorMarker;
use crate::defaults::{BROADCAST_ADDRESS, DEFAULT_CHANNEL, DEFAULT_TICK_MS, DEVICE_ID};
use crate::frame::MacAddress;
use crate::reporter::ReportFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingerConfig {
    /// Identifier carried by every broadcast probe
    pub device_id: MacAddress,
    /// Probe destination
    pub broadcast: MacAddress,
    /// Marker captured frames must carry
    pub marker: VendorMarker,
    /// Broadcast period in milliseconds
    pub tick_ms: u64,
    /// Wi-Fi channel (1-14)
    pub channel: u8,
    /// Enable 802.11 LR alongside b/g/n
    pub long_range: bool,
    /// How samples are written out
    pub report_format: ReportFormat,
}

impl PingerConfig {
    pub const fn new() -> Self {
        Self {
            device_id: DEVICE_ID,
            broadcast: BROADCAST_ADDRESS,
            marker: VendorMarker::ESP_NOW,
            tick_ms: DEFAULT_TICK_MS,
            channel: DEFAULT_CHANNEL,
            long_range: false,
            report_format: ReportFormat::Plain,
        }
    }

    /// Apply one override.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "device_id" => {
                self.device_id = parse_mac(value).ok_or(ConfigError::InvalidValue("device_id"))?;
            }
            "broadcast" => {
                self.broadcast = parse_mac(value).ok_or(ConfigError::InvalidValue("broadcast"))?;
            }
            "tick_ms" => match value.parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_ms = ms,
                _ => return Err(ConfigError::InvalidValue("tick_ms")),
            },
            "channel" => match value.parse::<u8>() {
                Ok(ch @ 1..=14) => self.channel = ch,
                _ => return Err(ConfigError::InvalidValue("channel")),
            },
            "long_range" => match value {
                "true" | "1" => self.long_range = true,
                "false" | "0" => self.long_range = false,
                _ => return Err(ConfigError::InvalidValue("long_range")),
            },
            "format" => match value {
                "plain" => self.report_format = ReportFormat::Plain,
                "ndjson" => self.report_format = ReportFormat::Ndjson,
                _ => return Err(ConfigError::InvalidValue("format")),
            },
            _ => return Err(ConfigError::UnknownKey),
        }
        log::info!("Config override: {} = {}", key, value);
        Ok(())
    }

    /// Apply every override that is present, stopping at the first bad one.
    ///
    /// Firmware passes `option_env!` values here, so absent keys are `None`.
    pub fn apply_overrides(&mut self, overrides: &[(&str, Option<&str>)]) -> Result<(), ConfigError> {
        for &(key, value) in overrides {
            if let Some(value) = value {
                self.set(key, value)?;
            }
        }
        Ok(())
    }
}

impl Default for PingerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    UnknownKey,
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKey => write!(f, "unknown config key"),
            ConfigError::InvalidValue(key) => write!(f, "invalid value for {}", key),
        }
    }
}

/// Parse "aa:bb:cc:dd:ee:ff" (either case).
pub fn parse_mac(s: &str) -> Option<MacAddress> {
    let mut mac = [0u8; 6];
    let mut parts = s.split(':');
    for byte in mac.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = PingerConfig::default();
        assert_eq!(config.device_id, [0x01, 0x23, 0x45, 0x67, 0x89, 0xab]);
        assert_eq!(config.broadcast, [0xff; 6]);
        assert_eq!(config.tick_ms, 10);
        assert_eq!(config.channel, 1);
        assert!(!config.long_range);
        assert_eq!(config.report_format, ReportFormat::Plain);
        assert_eq!(config.marker, VendorMarker::ESP_NOW);
    }

    #[test]
    fn parse_mac_accepts_both_cases() {
        assert_eq!(
            parse_mac("7c:DF:a1:01:F3:14"),
            Some([0x7c, 0xdf, 0xa1, 0x01, 0xf3, 0x14])
        );
    }

    #[test]
    fn parse_mac_rejects_malformed() {
        assert_eq!(parse_mac(""), None);
        assert_eq!(parse_mac("7c:df:a1:01:f3"), None);
        assert_eq!(parse_mac("7c:df:a1:01:f3:14:00"), None);
        assert_eq!(parse_mac("7c:df:a1:01:f3:1"), None);
        assert_eq!(parse_mac("7c:df:a1:01:f3:zz"), None);
        assert_eq!(parse_mac("7cdfa101f314"), None);
        assert_eq!(parse_mac("+c:df:a1:01:f3:14"), None);
    }

    #[test]
    fn set_each_key() {
        let mut config = PingerConfig::new();
        config.set("device_id", "aa:bb:cc:dd:ee:ff").unwrap();
        config.set("tick_ms", "250").unwrap();
        config.set("channel", "6").unwrap();
        config.set("long_range", "true").unwrap();
        config.set("format", "ndjson").unwrap();
        config.set("broadcast", "02:00:5e:10:20:30").unwrap();
        assert_eq!(config.broadcast, [0x02, 0x00, 0x5e, 0x10, 0x20, 0x30]);
        assert_eq!(config.device_id, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.channel, 6);
        assert!(config.long_range);
        assert_eq!(config.report_format, ReportFormat::Ndjson);
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut config = PingerConfig::new();
        assert_eq!(config.set("tick_ms", "0"), Err(ConfigError::InvalidValue("tick_ms")));
        assert_eq!(config.set("tick_ms", "-5"), Err(ConfigError::InvalidValue("tick_ms")));
        assert_eq!(config.set("channel", "15"), Err(ConfigError::InvalidValue("channel")));
        assert_eq!(config.set("channel", "0"), Err(ConfigError::InvalidValue("channel")));
        assert_eq!(config.set("long_range", "yes"), Err(ConfigError::InvalidValue("long_range")));
        assert_eq!(config.set("format", "xml"), Err(ConfigError::InvalidValue("format")));
        assert_eq!(config.set("device_id", "nope"), Err(ConfigError::InvalidValue("device_id")));
        assert_eq!(config.set("broadcast", "ff:ff"), Err(ConfigError::InvalidValue("broadcast")));
        assert_eq!(config.set("pmk", "x"), Err(ConfigError::UnknownKey));
        assert_eq!(config, PingerConfig::new());
    }

    #[test]
    fn apply_overrides_skips_absent() {
        let mut config = PingerConfig::new();
        config
            .apply_overrides(&[("tick_ms", Some(" 20 ")), ("channel", None), ("format", None)])
            .unwrap();
        assert_eq!(config.tick_ms, 20);
        assert_eq!(config.channel, 1);
    }

    #[test]
    fn apply_overrides_stops_at_first_error() {
        let mut config = PingerConfig::new();
        let result = config.apply_overrides(&[("channel", Some("99")), ("tick_ms", Some("20"))]);
        assert_eq!(result, Err(ConfigError::InvalidValue("channel")));
        assert_eq!(config.tick_ms, 10);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            ConfigError::InvalidValue("channel").to_string(),
            "invalid value for channel"
        );
        assert_eq!(ConfigError::UnknownKey.to_string(), "unknown config key");
    }
}
