//! The `smart_attendance/ble_advertiser` channel.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::advertiser::BleAdvertiser;
use crate::ble::backend::PeripheralBackend;
use crate::channel::{MethodCall, MethodCallHandler, MethodChannel, MethodResult, INVALID_ARGUMENT};

/// Channel name shared with the application shell.
pub const ADVERTISER_CHANNEL: &str = "smart_attendance/ble_advertiser";

/// Method: start advertising `args.uuid`.
pub const START_ADVERTISING: &str = "startAdvertising";
/// Method: stop advertising.
pub const STOP_ADVERTISING: &str = "stopAdvertising";
/// Method: query support.
pub const IS_ADVERTISING_SUPPORTED: &str = "isAdvertisingSupported";

/// Routes the three advertiser methods to a [`BleAdvertiser`].
pub struct AdvertiserMethodHandler<B: PeripheralBackend + 'static> {
    advertiser: Arc<BleAdvertiser<B>>,
}

impl<B: PeripheralBackend + 'static> AdvertiserMethodHandler<B> {
    /// Create a handler for `advertiser`.
    pub fn new(advertiser: Arc<BleAdvertiser<B>>) -> Self {
        Self { advertiser }
    }

    /// Get the advertiser.
    pub fn advertiser(&self) -> &Arc<BleAdvertiser<B>> {
        &self.advertiser
    }

    async fn start_advertising(&self, call: &MethodCall) -> MethodResult {
        let Some(uuid) = call.argument::<String>("uuid") else {
            return MethodResult::error(INVALID_ARGUMENT, "UUID is required");
        };

        match self.advertiser.start_advertising(&uuid).await {
            Ok(started) => MethodResult::success(started),
            Err(e) if e.is_invalid_argument() => MethodResult::error(INVALID_ARGUMENT, e.to_string()),
            Err(e) => {
                warn!("startAdvertising failed: {}", e);
                MethodResult::success(false)
            }
        }
    }
}

#[async_trait]
impl<B: PeripheralBackend + 'static> MethodCallHandler for AdvertiserMethodHandler<B> {
    async fn on_method_call(&self, call: MethodCall) -> MethodResult {
        match call.method.as_str() {
            START_ADVERTISING => self.start_advertising(&call).await,
            STOP_ADVERTISING => {
                self.advertiser.stop_advertising().await;
                MethodResult::success(true)
            }
            IS_ADVERTISING_SUPPORTED => {
                MethodResult::success(self.advertiser.is_advertising_supported().await)
            }
            other => {
                debug!("Unknown method: {}", other);
                MethodResult::NotImplemented
            }
        }
    }
}

/// Build the `smart_attendance/ble_advertiser` channel around `advertiser`.
pub fn advertiser_channel<B: PeripheralBackend + 'static>(
    advertiser: Arc<BleAdvertiser<B>>,
) -> MethodChannel {
    let mut channel = MethodChannel::new(ADVERTISER_CHANNEL);
    channel.set_method_call_handler(Arc::new(AdvertiserMethodHandler::new(advertiser)));
    channel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::backend::{AdapterState, MockPeripheralBackend};
    use crate::ble::simulated::SimulatedBackend;
    use crate::config::{AdvertiserConfig, SupportPolicy};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::broadcast;

    const BEACON: &str = "0000ffe0-0000-1000-8000-00805f9b34fb";

    fn handler(backend: SimulatedBackend) -> AdvertiserMethodHandler<SimulatedBackend> {
        AdvertiserMethodHandler::new(Arc::new(BleAdvertiser::new(backend)))
    }

    #[tokio::test]
    async fn test_start_with_valid_uuid() {
        let handler = handler(SimulatedBackend::new());

        let result = handler
            .on_method_call(MethodCall::new(START_ADVERTISING, json!({ "uuid": BEACON })))
            .await;
        assert_eq!(result, MethodResult::success(true));

        let supported = handler
            .on_method_call(MethodCall::without_arguments(IS_ADVERTISING_SUPPORTED))
            .await;
        assert_eq!(supported, MethodResult::success(true));
    }

    #[tokio::test]
    async fn test_start_missing_uuid() {
        let handler = handler(SimulatedBackend::new());

        for args in [json!({}), json!(null), json!({ "uuid": 42 })] {
            let result = handler
                .on_method_call(MethodCall::new(START_ADVERTISING, args))
                .await;
            assert_eq!(
                result,
                MethodResult::error(INVALID_ARGUMENT, "UUID is required")
            );
        }
        assert!(handler.advertiser().backend().start_requests().is_empty());
    }

    #[tokio::test]
    async fn test_start_malformed_uuid_issues_no_backend_call() {
        let mut mock = MockPeripheralBackend::new();
        mock.expect_subscribe().returning(|| broadcast::channel(1).1);
        mock.expect_has_advertiser().never();
        mock.expect_start_advertising().never();

        let handler = AdvertiserMethodHandler::new(Arc::new(BleAdvertiser::new(mock)));
        let result = handler
            .on_method_call(MethodCall::new(START_ADVERTISING, json!({ "uuid": "not-a-uuid" })))
            .await;

        assert_eq!(result.error_code(), Some(INVALID_ARGUMENT));
        assert_eq!(result.as_bool(), None);
    }

    #[tokio::test]
    async fn test_start_without_advertiser() {
        let handler = handler(SimulatedBackend::without_advertiser());

        let result = handler
            .on_method_call(MethodCall::new(START_ADVERTISING, json!({ "uuid": BEACON })))
            .await;
        assert_eq!(result, MethodResult::success(false));
        assert!(!handler.advertiser().is_advertising());
    }

    #[tokio::test]
    async fn test_stop_always_true() {
        let handler = handler(SimulatedBackend::new());

        let result = handler
            .on_method_call(MethodCall::without_arguments(STOP_ADVERTISING))
            .await;
        assert_eq!(result, MethodResult::success(true));
    }

    #[tokio::test]
    async fn test_support_follows_policy() {
        let backend = SimulatedBackend::with_state(true, AdapterState::PoweredOff);
        let config = AdvertiserConfig::default().with_support_policy(SupportPolicy::RequirePoweredOn);
        let advertiser = Arc::new(BleAdvertiser::with_config(backend, config));
        let handler = AdvertiserMethodHandler::new(advertiser.clone());

        let call = MethodCall::without_arguments(IS_ADVERTISING_SUPPORTED);
        assert_eq!(handler.on_method_call(call.clone()).await, MethodResult::success(false));

        advertiser.backend().set_adapter_state(AdapterState::PoweredOn);
        assert_eq!(handler.on_method_call(call).await, MethodResult::success(true));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let channel = advertiser_channel(Arc::new(BleAdvertiser::new(SimulatedBackend::new())));
        assert_eq!(channel.name(), ADVERTISER_CHANNEL);

        let result = channel
            .invoke_method(MethodCall::without_arguments("startScanning"))
            .await;
        assert_eq!(result, MethodResult::NotImplemented);
    }
}
