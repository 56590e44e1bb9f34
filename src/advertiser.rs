//! Advertising control surface.
//!
//! [`BleAdvertiser`] owns the single advertising session of the process and
//! forwards start/stop requests to a [`PeripheralBackend`]. Operational
//! failures never escape as errors: they are logged and reported as `false`.
//! Only malformed input is returned as an [`Error`].

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ble::backend::{AdvertiserEvent, PeripheralBackend, SessionHandle};
use crate::ble::settings::AdvertiseData;
use crate::ble::uuids::parse_service_uuid;
use crate::config::{AdvertiserConfig, SupportPolicy};
use crate::error::{Error, Result};

/// Whether an advertisement is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvertisingState {
    /// Nothing on air.
    #[default]
    Idle,
    /// A session is active.
    Advertising {
        /// Advertised service.
        service_uuid: Uuid,
        /// When the request was issued.
        started_at: DateTime<Utc>,
    },
}

impl AdvertisingState {
    /// Check if advertising.
    pub fn is_advertising(&self) -> bool {
        matches!(self, Self::Advertising { .. })
    }
}

impl std::fmt::Display for AdvertisingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Advertising { service_uuid, .. } => write!(f, "Advertising {}", service_uuid),
        }
    }
}

/// Single-session BLE advertiser.
pub struct BleAdvertiser<B: PeripheralBackend + 'static> {
    /// The platform stack.
    backend: Arc<B>,
    /// Settings and policy.
    config: AdvertiserConfig,
    /// The active session, if any.
    session: RwLock<Option<SessionHandle>>,
    /// Held across backend calls so start and stop never interleave.
    op_lock: tokio::sync::Mutex<()>,
    /// Channel for logged backend events.
    event_tx: broadcast::Sender<AdvertiserEvent>,
    /// Handle to the event logging task.
    logger_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl<B: PeripheralBackend + 'static> BleAdvertiser<B> {
    /// Create an advertiser with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, AdvertiserConfig::default())
    }

    /// Create an advertiser with an explicit configuration.
    ///
    /// When called inside a Tokio runtime the event logger starts right away,
    /// otherwise it starts with the first advertisement.
    pub fn with_config(backend: B, config: AdvertiserConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        let advertiser = Self {
            backend: Arc::new(backend),
            config,
            session: RwLock::new(None),
            op_lock: tokio::sync::Mutex::new(()),
            event_tx,
            logger_handle: RwLock::new(None),
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            advertiser.ensure_event_logger();
        }

        advertiser
    }

    /// Get the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the configuration.
    pub fn config(&self) -> &AdvertiserConfig {
        &self.config
    }

    /// Start advertising the service UUID given as a string.
    ///
    /// Returns `Ok(true)` once the backend has accepted the request. Whether
    /// the radio actually went on air is only reported later as an
    /// [`AdvertiserEvent`]. Returns `Ok(false)` if the advertiser is
    /// unavailable or the backend failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUuid`] if `uuid` does not parse. The backend is
    /// not touched in that case.
    pub async fn start_advertising(&self, uuid: &str) -> Result<bool> {
        let service_uuid = match parse_service_uuid(uuid) {
            Ok(service_uuid) => service_uuid,
            Err(e) => {
                warn!("Invalid UUID string: {:?}", uuid);
                return Err(e);
            }
        };

        match self.start_service(service_uuid).await {
            Ok(session) => {
                info!(
                    "BLE advertising requested for UUID {} (session {})",
                    service_uuid, session.id
                );
                Ok(true)
            }
            Err(e) => {
                warn!("BLE advertising not started for UUID {}: {}", service_uuid, e);
                Ok(false)
            }
        }
    }

    /// Start advertising a parsed service UUID, reporting why it failed.
    ///
    /// Any running session is stopped first.
    pub async fn start_service(&self, service_uuid: Uuid) -> Result<SessionHandle> {
        let _op = self.op_lock.lock().await;

        if !self.backend.has_advertiser().await {
            return Err(Error::AdvertiserUnavailable);
        }

        if self.config.support_policy == SupportPolicy::RequirePoweredOn {
            let state = self.backend.adapter_state().await;
            if !state.is_powered_on() {
                return Err(Error::AdapterNotReady { state });
            }
        }

        let data = AdvertiseData::for_service(service_uuid);
        data.validate().map_err(Error::AdvertiseFailed)?;

        let previous = self.session.write().take();
        if let Some(previous) = previous {
            debug!("Replacing active advertising session");
            self.stop_session(previous).await;
        }

        self.ensure_event_logger();

        let session = self
            .backend
            .start_advertising(&self.config.settings, &data)
            .await?;

        *self.session.write() = Some(session.clone());
        Ok(session)
    }

    /// Stop advertising. Does nothing if no session is active.
    pub async fn stop_advertising(&self) {
        let _op = self.op_lock.lock().await;
        let session = self.session.write().take();

        let Some(session) = session else {
            debug!("Not advertising, ignoring stop request");
            return;
        };

        self.stop_session(session).await;
    }

    async fn stop_session(&self, session: SessionHandle) {
        match self.backend.stop_advertising(&session).await {
            Ok(()) => info!("BLE advertising stopped for UUID {}", session.service_uuid),
            Err(e) => error!("Failed to stop advertising session {}: {}", session.id, e),
        }
    }

    /// Whether the platform can advertise right now.
    pub async fn is_advertising_supported(&self) -> bool {
        if !self.backend.has_advertiser().await {
            return false;
        }

        match self.config.support_policy {
            SupportPolicy::AdvertiserPresent => true,
            SupportPolicy::RequirePoweredOn => self.backend.adapter_state().await.is_powered_on(),
        }
    }

    /// Check if a session is active.
    pub fn is_advertising(&self) -> bool {
        self.session.read().is_some()
    }

    /// Current state.
    pub fn state(&self) -> AdvertisingState {
        match &*self.session.read() {
            Some(session) => AdvertisingState::Advertising {
                service_uuid: session.service_uuid,
                started_at: session.started_at,
            },
            None => AdvertisingState::Idle,
        }
    }

    /// The service UUID being advertised, if any.
    pub fn active_service_uuid(&self) -> Option<Uuid> {
        self.session.read().as_ref().map(|s| s.service_uuid)
    }

    /// Subscribe to backend events.
    pub fn subscribe(&self) -> broadcast::Receiver<AdvertiserEvent> {
        self.event_tx.subscribe()
    }

    /// Backend events as a stream. Lagged events are skipped.
    pub fn events(&self) -> impl Stream<Item = AdvertiserEvent> + Send + 'static {
        stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Stop advertising and end the event logger.
    pub async fn shutdown(&self) {
        info!("Shutting down BLE advertiser");

        self.stop_advertising().await;

        if let Some(handle) = self.logger_handle.write().take() {
            handle.abort();
        }
    }

    fn ensure_event_logger(&self) {
        let mut guard = self.logger_handle.write();
        if (*guard).as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let mut rx = self.backend.subscribe();
        let event_tx = self.event_tx.clone();

        *guard = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        log_event(&event);
                        let _ = event_tx.send(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Advertiser event logger skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            debug!("Advertiser event logger ended");
        }));
    }
}

fn log_event(event: &AdvertiserEvent) {
    match event {
        AdvertiserEvent::StateChanged(state) => info!("Bluetooth adapter state: {}", state),
        AdvertiserEvent::StartSucceeded { service_uuid } => {
            info!("BLE advertising started for UUID {}", service_uuid)
        }
        AdvertiserEvent::StartFailed {
            service_uuid,
            reason,
        } => error!(
            "BLE advertising failed for UUID {} with error {} ({})",
            service_uuid,
            reason.code(),
            reason
        ),
        AdvertiserEvent::Stopped { service_uuid } => {
            debug!("BLE advertisement withdrawn for UUID {}", service_uuid)
        }
    }
}

impl<B: PeripheralBackend + 'static> Drop for BleAdvertiser<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.logger_handle.get_mut().take() {
            handle.abort();
        }

        let Some(session) = self.session.get_mut().take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let backend = self.backend.clone();
                runtime.spawn(async move {
                    if let Err(e) = backend.stop_advertising(&session).await {
                        error!("Failed to stop advertising on teardown: {}", e);
                    }
                });
            }
            Err(_) => warn!(
                "BLE advertiser dropped outside a runtime while advertising {}",
                session.service_uuid
            ),
        }
    }
}
