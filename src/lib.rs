// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # smart-attendance-ble
//!
//! BLE peripheral advertising for the Smart Attendance admin app, exposed to
//! the application shell over the `smart_attendance/ble_advertiser` method
//! channel.
//!
//! The admin device broadcasts a session's service UUID; student devices scan
//! for it to prove presence. This crate owns exactly one advertising session
//! at a time and relays three calls to the platform Bluetooth stack:
//!
//! - `startAdvertising { uuid }` → `bool`
//! - `stopAdvertising` → `true`
//! - `isAdvertisingSupported` → `bool`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smart_attendance_ble::{advertiser_channel, BleAdvertiser, MethodCall, SimulatedBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let advertiser = Arc::new(BleAdvertiser::new(SimulatedBackend::new()));
//!     let channel = advertiser_channel(advertiser.clone());
//!
//!     let call = MethodCall::new(
//!         "startAdvertising",
//!         serde_json::json!({ "uuid": "0000ffe0-0000-1000-8000-00805f9b34fb" }),
//!     );
//!     let result = channel.invoke_method(call).await;
//!     println!("started: {:?}", result.as_bool());
//!
//!     advertiser.shutdown().await;
//! }
//! ```
//!
//! ## Backends
//!
//! - [`SimulatedBackend`]: in-process stack for tests and demos.
//! - `BluezBackend` (feature `bluez`, Linux): advertises through `bluetoothd`.
//!   The user may need to be in the `bluetooth` group.
//!
//! ## Error handling
//!
//! Malformed input is the only error that reaches the caller
//! (`INVALID_ARGUMENT` on the channel). Everything else (no adapter, adapter
//! off, stack failures) is logged and reported as `false`.

// Public modules
pub mod advertiser;
pub mod ble;
pub mod channel;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use advertiser::{AdvertisingState, BleAdvertiser};
pub use config::{AdvertiserConfig, SupportPolicy};
pub use error::{Error, Result};

pub use ble::{
    AdapterState, AdvertiseData, AdvertiseFailure, AdvertiseMode, AdvertiseSettings,
    AdvertiserEvent, InjectedFailure, PeripheralBackend, SessionHandle, SimulatedBackend,
    TxPowerLevel,
};
#[cfg(all(feature = "bluez", target_os = "linux"))]
pub use ble::BluezBackend;
pub use channel::{
    advertiser_channel, AdvertiserMethodHandler, MethodCall, MethodCallHandler, MethodChannel,
    MethodResult, ADVERTISER_CHANNEL, INVALID_ARGUMENT,
};
