//! BLE peripheral module.
//!
//! This module provides the backend abstraction over a platform Bluetooth
//! stack, the advertising settings and payload types, and UUID handling.

pub mod backend;
#[cfg(all(feature = "bluez", target_os = "linux"))]
pub mod bluez;
pub mod settings;
pub mod simulated;
pub mod uuids;

pub use backend::{AdapterState, AdvertiseFailure, AdvertiserEvent, PeripheralBackend, SessionHandle};
#[cfg(all(feature = "bluez", target_os = "linux"))]
pub use bluez::BluezBackend;
pub use settings::{AdvertiseData, AdvertiseMode, AdvertiseSettings, TxPowerLevel};
pub use simulated::{InjectedFailure, SimulatedBackend};
pub use uuids::*;
