//! RSSI pinger library: ESP-NOW peer sensing.
//!
//! Every pinger broadcasts a small ESP-NOW frame on a fixed period and
//! sniffs the channel in promiscuous mode. Captured frames carrying the
//! ESP-NOW vendor marker are reported as `(peer address, RSSI)` pairs.
//!
//! This crate holds the platform-independent part: frame views, the
//! classifier, reporting and the broadcast scheduler. It is `no_std`,
//! allocation-free and testable on any host with
//! `cargo test --no-default-features`. The firmware binaries (Embassy
//! `no_std` in `src/main.rs`, ESP-IDF `std` in `firmware-std/`) supply the
//! radio and the console.

#![cfg_attr(not(test), no_std)]

pub mod classifier;
pub mod config;
pub mod defaults;
pub mod frame;
pub mod protocol;
pub mod reporter;
pub mod scheduler;

/// Target chip name for status reports.
#[cfg(feature = "chip-esp32")]
pub const CHIP: &str = "esp32";
#[cfg(all(feature = "chip-esp32s3", not(feature = "chip-esp32")))]
pub const CHIP: &str = "esp32s3";
#[cfg(not(any(feature = "chip-esp32", feature = "chip-esp32s3")))]
pub const CHIP: &str = "unknown";
