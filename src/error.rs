//! Error types for the smart-attendance-ble crate.

use thiserror::Error;

use crate::ble::backend::{AdapterState, AdvertiseFailure};

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from BlueZ.
    #[cfg(all(feature = "bluez", target_os = "linux"))]
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),

    /// The supplied string is not a valid UUID.
    #[error("Invalid UUID: {value}")]
    InvalidUuid {
        /// The string that failed to parse.
        value: String,
    },

    /// A required method argument was absent or had the wrong type.
    #[error("Missing argument: {name}")]
    MissingArgument {
        /// The name of the argument.
        name: String,
    },

    /// The platform exposes no LE advertiser.
    #[error("BLE advertiser not available")]
    AdvertiserUnavailable,

    /// The adapter exists but is not in a state that allows advertising.
    #[error("Bluetooth adapter not ready: {state}")]
    AdapterNotReady {
        /// The adapter state at the time of the request.
        state: AdapterState,
    },

    /// The backend rejected the advertisement.
    #[error("Advertising failed: {0}")]
    AdvertiseFailed(AdvertiseFailure),

    /// No advertising session with this id is known to the backend.
    #[error("Advertising session not found: {id}")]
    SessionNotFound {
        /// The session id that was looked up.
        id: u64,
    },

    /// A method channel message could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A reply envelope had the wrong shape.
    #[error("Invalid reply envelope of {len} elements")]
    InvalidEnvelope {
        /// Number of elements found.
        len: usize,
    },

    /// Any other backend failure.
    #[error("Backend error: {reason}")]
    Backend {
        /// Description of the failure.
        reason: String,
    },
}

impl Error {
    /// Whether this error stems from caller input rather than the platform.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidUuid { .. } | Self::MissingArgument { .. })
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
