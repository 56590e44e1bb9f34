//! In-process backend with a controllable adapter.
//!
//! Stands in for a platform stack in tests and demos. Outcomes are emitted
//! from a spawned task so callers observe them asynchronously, the way a real
//! stack reports them on its own callback thread.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::backend::{
    AdapterState, AdvertiseFailure, AdvertiserEvent, PeripheralBackend, SessionHandle,
};
use crate::ble::settings::{AdvertiseData, AdvertiseSettings};
use crate::error::{Error, Result};

/// How the next start request should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// `start_advertising` itself returns an error.
    Immediate,
    /// The request is accepted and later reported as failed.
    Deferred(AdvertiseFailure),
}

/// A start request as the simulated stack received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    /// Settings passed in.
    pub settings: AdvertiseSettings,
    /// Payload passed in.
    pub data: AdvertiseData,
}

/// Simulated LE peripheral stack.
pub struct SimulatedBackend {
    has_advertiser: RwLock<bool>,
    state: RwLock<AdapterState>,
    sessions: Arc<RwLock<HashMap<u64, SessionHandle>>>,
    requests: RwLock<Vec<StartRequest>>,
    failures: RwLock<VecDeque<InjectedFailure>>,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<AdvertiserEvent>,
}

impl SimulatedBackend {
    /// A powered-on adapter with an advertiser.
    pub fn new() -> Self {
        Self::with_state(true, AdapterState::PoweredOn)
    }

    /// A device without any LE advertiser.
    pub fn without_advertiser() -> Self {
        Self::with_state(false, AdapterState::Unsupported)
    }

    /// A backend in an explicit state.
    pub fn with_state(has_advertiser: bool, state: AdapterState) -> Self {
        let (event_tx, _) = broadcast::channel(32);

        Self {
            has_advertiser: RwLock::new(has_advertiser),
            state: RwLock::new(state),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            requests: RwLock::new(Vec::new()),
            failures: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            event_tx,
        }
    }

    /// Change the adapter state and notify subscribers.
    ///
    /// Powering off drops every running advertisement, as a real stack does.
    pub fn set_adapter_state(&self, state: AdapterState) {
        let old = std::mem::replace(&mut *self.state.write(), state);
        if old == state {
            return;
        }

        debug!("Simulated adapter state: {} -> {}", old, state);

        if !state.is_powered_on() {
            self.sessions.write().clear();
        }

        let _ = self.event_tx.send(AdvertiserEvent::StateChanged(state));
    }

    /// Add or remove the LE advertiser.
    pub fn set_has_advertiser(&self, present: bool) {
        *self.has_advertiser.write() = present;
    }

    /// Queue a failure for the next start request.
    pub fn inject_failure(&self, failure: InjectedFailure) {
        self.failures.write().push_back(failure);
    }

    /// Advertisements currently on air.
    pub fn active_sessions(&self) -> Vec<SessionHandle> {
        let mut sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    /// Every start request received so far.
    pub fn start_requests(&self) -> Vec<StartRequest> {
        self.requests.read().clone()
    }

    fn emit_later(&self, event: AdvertiserEvent) {
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = event_tx.send(event);
        });
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeripheralBackend for SimulatedBackend {
    async fn has_advertiser(&self) -> bool {
        *self.has_advertiser.read()
    }

    async fn adapter_state(&self) -> AdapterState {
        *self.state.read()
    }

    async fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
    ) -> Result<SessionHandle> {
        if !*self.has_advertiser.read() {
            return Err(Error::AdvertiserUnavailable);
        }

        self.requests.write().push(StartRequest {
            settings: *settings,
            data: data.clone(),
        });

        let service_uuid = data.primary_service().unwrap_or_else(Uuid::nil);
        let state = *self.state.read();

        let failure = match self.failures.write().pop_front() {
            Some(InjectedFailure::Immediate) => {
                return Err(Error::Backend {
                    reason: "simulated stack exception".to_string(),
                })
            }
            Some(InjectedFailure::Deferred(reason)) => Some(reason),
            None if !state.is_powered_on() => Some(AdvertiseFailure::InternalError),
            None => data.validate().err(),
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = SessionHandle::new(id, service_uuid);

        match failure {
            Some(reason) => {
                trace!("Simulated start {} will fail: {}", id, reason);
                self.emit_later(AdvertiserEvent::StartFailed {
                    service_uuid,
                    reason,
                });
            }
            None => {
                self.sessions.write().insert(id, handle.clone());
                self.emit_later(AdvertiserEvent::StartSucceeded { service_uuid });
            }
        }

        Ok(handle)
    }

    async fn stop_advertising(&self, session: &SessionHandle) -> Result<()> {
        if self.sessions.write().remove(&session.id).is_some() {
            self.emit_later(AdvertiserEvent::Stopped {
                service_uuid: session.service_uuid,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AdvertiserEvent> {
        self.event_tx.subscribe()
    }
}
