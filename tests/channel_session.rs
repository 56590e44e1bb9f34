//! End-to-end sessions over the JSON-encoded advertiser channel.

use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::json;
use smart_attendance_ble::channel::codec::{decode_envelope, encode_method_call};
use smart_attendance_ble::{
    advertiser_channel, AdapterState, AdvertiserConfig, BleAdvertiser, MethodCall, MethodChannel,
    MethodResult, SimulatedBackend, SupportPolicy, INVALID_ARGUMENT,
};
use std::sync::Arc;

const BEACON: &str = "0000ffe0-0000-1000-8000-00805f9b34fb";

async fn call(channel: &MethodChannel, method: &str, args: serde_json::Value) -> MethodResult {
    let message = encode_method_call(&MethodCall::new(method, args));
    let reply = channel.handle_message(message).await.unwrap_or_default();
    decode_envelope(&reply).unwrap()
}

#[tokio::test]
async fn test_attendance_session_lifecycle() {
    let advertiser = Arc::new(BleAdvertiser::new(SimulatedBackend::new()));
    let channel = advertiser_channel(advertiser.clone());

    assert_eq!(
        call(&channel, "isAdvertisingSupported", json!(null)).await,
        MethodResult::success(true)
    );
    assert_eq!(
        call(&channel, "startAdvertising", json!({ "uuid": BEACON })).await,
        MethodResult::success(true)
    );
    assert!(advertiser.is_advertising());
    assert_eq!(
        call(&channel, "isAdvertisingSupported", json!(null)).await,
        MethodResult::success(true)
    );

    assert_eq!(
        call(&channel, "stopAdvertising", json!(null)).await,
        MethodResult::success(true)
    );
    assert!(!advertiser.is_advertising());
    assert!(advertiser.backend().active_sessions().is_empty());

    // Stopping again is harmless.
    assert_eq!(
        call(&channel, "stopAdvertising", json!(null)).await,
        MethodResult::success(true)
    );
}

#[tokio::test]
async fn test_invalid_uuid_is_argument_error() {
    let advertiser = Arc::new(BleAdvertiser::new(SimulatedBackend::new()));
    let channel = advertiser_channel(advertiser.clone());

    let result = call(&channel, "startAdvertising", json!({ "uuid": "not-a-uuid" })).await;
    assert_eq!(result.error_code(), Some(INVALID_ARGUMENT));

    let result = call(&channel, "startAdvertising", json!({})).await;
    assert_eq!(
        result,
        MethodResult::error(INVALID_ARGUMENT, "UUID is required")
    );

    assert!(advertiser.backend().start_requests().is_empty());
}

#[tokio::test]
async fn test_unknown_method_gets_empty_reply() {
    let channel = advertiser_channel(Arc::new(BleAdvertiser::new(SimulatedBackend::new())));

    let reply = channel
        .handle_message(encode_method_call(&MethodCall::without_arguments("enableGatt")))
        .await;
    assert_eq!(reply, None);

    let reply = channel.handle_message(Bytes::from_static(b"\xff")).await;
    assert!(reply.is_some());
}

#[tokio::test]
async fn test_powered_off_device_with_strict_policy() {
    let backend = SimulatedBackend::with_state(true, AdapterState::PoweredOff);
    let config = AdvertiserConfig::default().with_support_policy(SupportPolicy::RequirePoweredOn);
    let advertiser = Arc::new(BleAdvertiser::with_config(backend, config));
    let channel = advertiser_channel(advertiser.clone());

    assert_eq!(
        call(&channel, "isAdvertisingSupported", json!(null)).await,
        MethodResult::success(false)
    );
    assert_eq!(
        call(&channel, "startAdvertising", json!({ "uuid": BEACON })).await,
        MethodResult::success(false)
    );
    assert!(advertiser.backend().start_requests().is_empty());

    advertiser.backend().set_adapter_state(AdapterState::PoweredOn);
    assert_eq!(
        call(&channel, "startAdvertising", json!({ "uuid": BEACON })).await,
        MethodResult::success(true)
    );

    advertiser.shutdown().await;
    assert!(advertiser.backend().active_sessions().is_empty());
}
