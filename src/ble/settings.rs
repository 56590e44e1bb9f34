//! Advertising settings and payload description.
//!
//! These mirror the two objects a platform advertiser needs: how to broadcast
//! ([`AdvertiseSettings`]) and what to broadcast ([`AdvertiseData`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

use crate::ble::backend::AdvertiseFailure;
use crate::ble::uuids::short_uuid;

/// Maximum size of a legacy advertising PDU payload.
pub const MAX_LEGACY_ADVERTISING_PAYLOAD: usize = 31;

/// Size of the flags AD structure every discoverable advertisement carries.
const FLAGS_AD_LEN: usize = 3;

/// Size of a TX power level AD structure.
const TX_POWER_AD_LEN: usize = 3;

/// Advertising interval trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertiseMode {
    /// Roughly one advertisement per second.
    LowPower,
    /// Roughly four advertisements per second.
    Balanced,
    /// Roughly ten advertisements per second.
    #[default]
    LowLatency,
}

impl AdvertiseMode {
    /// Nominal advertising interval for this mode.
    pub fn interval(&self) -> Duration {
        match self {
            Self::LowPower => Duration::from_millis(1000),
            Self::Balanced => Duration::from_millis(250),
            Self::LowLatency => Duration::from_millis(100),
        }
    }
}

/// Transmit power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPowerLevel {
    /// About -21 dBm.
    UltraLow,
    /// About -15 dBm.
    Low,
    /// About -7 dBm.
    Medium,
    /// About +1 dBm.
    #[default]
    High,
}

impl TxPowerLevel {
    /// Approximate radiated power in dBm.
    pub fn dbm(&self) -> i16 {
        match self {
            Self::UltraLow => -21,
            Self::Low => -15,
            Self::Medium => -7,
            Self::High => 1,
        }
    }
}

/// How the advertisement is broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiseSettings {
    /// Advertising interval trade-off.
    pub mode: AdvertiseMode,
    /// Transmit power.
    pub tx_power: TxPowerLevel,
    /// Whether centrals may connect.
    pub connectable: bool,
    /// Stop advertising automatically after this long.
    pub timeout: Option<Duration>,
}

impl Default for AdvertiseSettings {
    fn default() -> Self {
        Self {
            mode: AdvertiseMode::LowLatency,
            tx_power: TxPowerLevel::High,
            connectable: false,
            timeout: None,
        }
    }
}

/// What the advertisement carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdvertiseData {
    /// Advertised service UUIDs.
    pub service_uuids: BTreeSet<Uuid>,
    /// Whether the adapter's local name is included.
    pub include_device_name: bool,
    /// Whether the TX power level is included.
    pub include_tx_power_level: bool,
}

impl AdvertiseData {
    /// Payload advertising `service_uuid` alone, without the device name.
    pub fn for_service(service_uuid: Uuid) -> Self {
        Self {
            service_uuids: BTreeSet::from([service_uuid]),
            include_device_name: false,
            include_tx_power_level: false,
        }
    }

    /// The first advertised service UUID.
    pub fn primary_service(&self) -> Option<Uuid> {
        self.service_uuids.iter().next().copied()
    }

    /// Encoded size of the legacy advertising payload, excluding the device
    /// name whose length is only known to the platform.
    pub fn encoded_len(&self) -> usize {
        let (short, long): (Vec<&Uuid>, Vec<&Uuid>) = self
            .service_uuids
            .iter()
            .partition(|uuid| short_uuid(uuid).is_some());

        let mut len = FLAGS_AD_LEN;
        if !short.is_empty() {
            len += 2 + 2 * short.len();
        }
        if !long.is_empty() {
            len += 2 + 16 * long.len();
        }
        if self.include_tx_power_level {
            len += TX_POWER_AD_LEN;
        }
        len
    }

    /// Check that the payload fits a legacy advertisement.
    pub fn validate(&self) -> std::result::Result<(), AdvertiseFailure> {
        if self.encoded_len() > MAX_LEGACY_ADVERTISING_PAYLOAD {
            return Err(AdvertiseFailure::DataTooLarge);
        }
        Ok(())
    }
}
