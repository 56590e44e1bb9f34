//! The seam between the advertiser and a platform Bluetooth stack.
//!
//! A [`PeripheralBackend`] owns the radio. It accepts start/stop requests and
//! reports outcomes asynchronously as [`AdvertiserEvent`]s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ble::settings::{AdvertiseData, AdvertiseSettings};
use crate::error::Result;

/// Power and authorization state of the Bluetooth adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// State not yet known.
    #[default]
    Unknown,
    /// The stack is restarting.
    Resetting,
    /// The device has no LE peripheral support.
    Unsupported,
    /// The application is not permitted to use Bluetooth.
    Unauthorized,
    /// Bluetooth is switched off.
    PoweredOff,
    /// Bluetooth is on and usable.
    PoweredOn,
}

impl AdapterState {
    /// Check if the adapter is powered on.
    pub fn is_powered_on(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Resetting => write!(f, "Resetting"),
            Self::Unsupported => write!(f, "Unsupported"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::PoweredOff => write!(f, "Powered off"),
            Self::PoweredOn => write!(f, "Powered on"),
        }
    }
}

/// Reason an advertisement could not be started.
///
/// Discriminants match the codes Android passes to `onStartFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AdvertiseFailure {
    /// The payload exceeds the advertising PDU.
    DataTooLarge = 1,
    /// No free advertising instance.
    TooManyAdvertisers = 2,
    /// This advertisement is already running.
    AlreadyStarted = 3,
    /// Internal stack error.
    InternalError = 4,
    /// The controller does not support this kind of advertisement.
    FeatureUnsupported = 5,
}

impl AdvertiseFailure {
    /// Create from a raw platform error code.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::DataTooLarge,
            2 => Self::TooManyAdvertisers,
            3 => Self::AlreadyStarted,
            5 => Self::FeatureUnsupported,
            _ => Self::InternalError,
        }
    }

    /// Convert to the raw platform error code.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl std::fmt::Display for AdvertiseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataTooLarge => write!(f, "advertise data too large"),
            Self::TooManyAdvertisers => write!(f, "too many advertisers"),
            Self::AlreadyStarted => write!(f, "already started"),
            Self::InternalError => write!(f, "internal error"),
            Self::FeatureUnsupported => write!(f, "feature unsupported"),
        }
    }
}

/// Asynchronous outcome reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertiserEvent {
    /// The adapter changed state.
    StateChanged(AdapterState),
    /// The radio is broadcasting.
    StartSucceeded {
        /// Advertised service.
        service_uuid: Uuid,
    },
    /// The radio refused to broadcast.
    StartFailed {
        /// Service that was requested.
        service_uuid: Uuid,
        /// Reported failure.
        reason: AdvertiseFailure,
    },
    /// A session was withdrawn.
    Stopped {
        /// Service that was advertised.
        service_uuid: Uuid,
    },
}

/// Opaque reference to a running advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Backend-assigned identifier.
    pub id: u64,
    /// The advertised service.
    pub service_uuid: Uuid,
    /// When the request was issued.
    pub started_at: DateTime<Utc>,
}

impl SessionHandle {
    /// Create a handle stamped with the current time.
    pub fn new(id: u64, service_uuid: Uuid) -> Self {
        Self {
            id,
            service_uuid,
            started_at: Utc::now(),
        }
    }
}

/// A platform Bluetooth stack capable of LE peripheral advertising.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeripheralBackend: Send + Sync {
    /// Whether the platform exposes an LE advertiser at all.
    async fn has_advertiser(&self) -> bool;

    /// Current adapter state.
    async fn adapter_state(&self) -> AdapterState;

    /// Ask the stack to start broadcasting.
    ///
    /// Returning `Ok` means the request was accepted, not that the radio is
    /// on air; the outcome follows as an [`AdvertiserEvent`].
    async fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
    ) -> Result<SessionHandle>;

    /// Withdraw a running advertisement.
    async fn stop_advertising(&self, session: &SessionHandle) -> Result<()>;

    /// Subscribe to asynchronous outcomes.
    fn subscribe(&self) -> broadcast::Receiver<AdvertiserEvent>;
}

#[async_trait]
impl<B: PeripheralBackend + ?Sized> PeripheralBackend for std::sync::Arc<B> {
    async fn has_advertiser(&self) -> bool {
        (**self).has_advertiser().await
    }

    async fn adapter_state(&self) -> AdapterState {
        (**self).adapter_state().await
    }

    async fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
    ) -> Result<SessionHandle> {
        (**self).start_advertising(settings, data).await
    }

    async fn stop_advertising(&self, session: &SessionHandle) -> Result<()> {
        (**self).stop_advertising(session).await
    }

    fn subscribe(&self) -> broadcast::Receiver<AdvertiserEvent> {
        (**self).subscribe()
    }
}
