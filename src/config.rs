//! Advertiser configuration.

use serde::{Deserialize, Serialize};

use crate::ble::settings::AdvertiseSettings;

/// Default capacity of the advertiser event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// When the advertiser counts as supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportPolicy {
    /// An LE advertiser exists, whatever the adapter's power state.
    #[default]
    AdvertiserPresent,
    /// An LE advertiser exists and the adapter is powered on.
    RequirePoweredOn,
}

/// Configuration for a [`BleAdvertiser`](crate::BleAdvertiser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvertiserConfig {
    /// Settings used for every advertisement.
    pub settings: AdvertiseSettings,
    /// How support is decided.
    pub support_policy: SupportPolicy,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for AdvertiserConfig {
    fn default() -> Self {
        Self {
            settings: AdvertiseSettings::default(),
            support_policy: SupportPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl AdvertiserConfig {
    /// Use these advertising settings.
    pub fn with_settings(mut self, settings: AdvertiseSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use this support policy.
    pub fn with_support_policy(mut self, policy: SupportPolicy) -> Self {
        self.support_policy = policy;
        self
    }

    /// Set the event channel capacity (at least 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
