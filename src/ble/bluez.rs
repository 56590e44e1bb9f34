//! BlueZ backend (Linux).
//!
//! Registers LE advertisements with `bluetoothd` through `bluer`. The
//! advertisement stays on air for as long as its `bluer` handle is alive.

use async_trait::async_trait;
use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use bluer::{Adapter, AdapterEvent, AdapterProperty, Session};
use futures::stream::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ble::backend::{AdapterState, AdvertiserEvent, PeripheralBackend, SessionHandle};
use crate::ble::settings::{AdvertiseData, AdvertiseSettings};
use crate::error::{Error, Result};

/// Backend driving the default BlueZ adapter.
pub struct BluezBackend {
    /// Keeps the D-Bus connection alive.
    _session: Session,
    adapter: Adapter,
    handles: Mutex<HashMap<u64, (Uuid, AdvertisementHandle)>>,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<AdvertiserEvent>,
    watcher: tokio::task::JoinHandle<()>,
}

impl BluezBackend {
    /// Connect to `bluetoothd` and pick the default adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if BlueZ is unreachable or there is no adapter.
    pub async fn new() -> Result<Self> {
        let session = Session::new().await?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|_e| Error::AdvertiserUnavailable)?;

        info!("Using Bluetooth adapter: {}", adapter.name());

        let (event_tx, _) = broadcast::channel(32);
        let watcher = Self::spawn_state_watcher(adapter.clone(), event_tx.clone()).await?;

        Ok(Self {
            _session: session,
            adapter,
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            event_tx,
            watcher,
        })
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn spawn_state_watcher(
        adapter: Adapter,
        event_tx: broadcast::Sender<AdvertiserEvent>,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let mut events = adapter.events().await?;

        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let AdapterEvent::PropertyChanged(AdapterProperty::Powered(powered)) = event {
                    let state = if powered {
                        AdapterState::PoweredOn
                    } else {
                        AdapterState::PoweredOff
                    };
                    let _ = event_tx.send(AdvertiserEvent::StateChanged(state));
                }
            }
            debug!("BlueZ adapter event stream ended");
        }))
    }

    fn to_advertisement(settings: &AdvertiseSettings, data: &AdvertiseData) -> Advertisement {
        let interval = settings.mode.interval();

        Advertisement {
            advertisement_type: if settings.connectable {
                Type::Peripheral
            } else {
                Type::Broadcast
            },
            service_uuids: data.service_uuids.clone(),
            local_name: None,
            discoverable: Some(settings.connectable),
            tx_power: Some(settings.tx_power.dbm()),
            min_interval: Some(interval),
            max_interval: Some(interval),
            timeout: settings.timeout,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeripheralBackend for BluezBackend {
    async fn has_advertiser(&self) -> bool {
        match self.adapter.supported_advertising_instances().await {
            Ok(instances) => instances > 0,
            Err(e) => {
                debug!("LE advertising manager not available: {}", e);
                false
            }
        }
    }

    async fn adapter_state(&self) -> AdapterState {
        match self.adapter.is_powered().await {
            Ok(true) => AdapterState::PoweredOn,
            Ok(false) => AdapterState::PoweredOff,
            Err(e) => {
                warn!("Failed to query adapter power: {}", e);
                AdapterState::Unknown
            }
        }
    }

    async fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
    ) -> Result<SessionHandle> {
        data.validate().map_err(Error::AdvertiseFailed)?;

        let service_uuid = data.primary_service().unwrap_or_else(Uuid::nil);
        let advertisement = Self::to_advertisement(settings, data);

        let handle = match self.adapter.advertise(advertisement).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("BlueZ rejected advertisement: {}", e);
                return Err(Error::Bluetooth(e));
            }
        };

        // BlueZ has accepted the registration once advertise() returns.
        let _ = self
            .event_tx
            .send(AdvertiserEvent::StartSucceeded { service_uuid });

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handles.lock().insert(id, (service_uuid, handle));

        Ok(SessionHandle::new(id, service_uuid))
    }

    async fn stop_advertising(&self, session: &SessionHandle) -> Result<()> {
        let (service_uuid, handle) = self
            .handles
            .lock()
            .remove(&session.id)
            .ok_or(Error::SessionNotFound { id: session.id })?;

        // Dropping the handle unregisters the advertisement.
        drop(handle);

        let _ = self
            .event_tx
            .send(AdvertiserEvent::Stopped { service_uuid });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AdvertiserEvent> {
        self.event_tx.subscribe()
    }
}

impl Drop for BluezBackend {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
