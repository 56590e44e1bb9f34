//! Method channel bridge.
//!
//! A [`MethodChannel`] is a named call/response bridge between an application
//! shell and native code. Calls arrive either as decoded [`MethodCall`]s or as
//! raw JSON-encoded messages and are answered by a [`MethodCallHandler`].

pub mod advertiser;
pub mod codec;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub use advertiser::{advertiser_channel, AdvertiserMethodHandler, ADVERTISER_CHANNEL};

/// Error code for malformed or missing call arguments.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

/// Error code for messages that could not be decoded.
pub const DECODE_ERROR: &str = "DECODE_ERROR";

/// A remote method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Method name.
    pub method: String,
    /// Arguments, usually a map or null.
    pub arguments: Value,
}

impl MethodCall {
    /// Create a call.
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Create a call without arguments.
    pub fn without_arguments(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Look up a keyed argument, returning `None` if the arguments are not a
    /// map, the key is absent, or the value has a different type.
    pub fn argument<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.arguments.as_object()?.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// The answer to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    /// The call succeeded with this value.
    Success(Value),
    /// The call failed.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: Option<String>,
        /// Extra details.
        details: Option<Value>,
    },
    /// The method is unknown to this channel.
    NotImplemented,
}

impl MethodResult {
    /// A successful result.
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success(value.into())
    }

    /// An error result without details.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: Some(message.into()),
            details: None,
        }
    }

    /// Check if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error code, if this is an error.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// The success value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Success(value) => value.as_bool(),
            _ => None,
        }
    }
}

/// Answers calls arriving on a channel.
#[async_trait]
pub trait MethodCallHandler: Send + Sync {
    /// Handle one call.
    async fn on_method_call(&self, call: MethodCall) -> MethodResult;
}

/// A named method channel.
pub struct MethodChannel {
    name: String,
    handler: Option<Arc<dyn MethodCallHandler>>,
}

impl MethodChannel {
    /// Create a channel with no handler. Every call is answered with
    /// [`MethodResult::NotImplemented`] until one is set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install (or replace) the handler.
    pub fn set_method_call_handler(&mut self, handler: Arc<dyn MethodCallHandler>) {
        self.handler = Some(handler);
    }

    /// Remove the handler.
    pub fn clear_method_call_handler(&mut self) {
        self.handler = None;
    }

    /// Dispatch a decoded call.
    pub async fn invoke_method(&self, call: MethodCall) -> MethodResult {
        trace!("{} <- {}", self.name, call.method);

        match &self.handler {
            Some(handler) => handler.on_method_call(call).await,
            None => {
                debug!("No handler on {}, {} not implemented", self.name, call.method);
                MethodResult::NotImplemented
            }
        }
    }

    /// Dispatch a JSON-encoded call and return the encoded reply.
    ///
    /// `None` is the empty reply used for unimplemented methods.
    pub async fn handle_message(&self, message: Bytes) -> Option<Bytes> {
        let call = match codec::decode_method_call(&message) {
            Ok(call) => call,
            Err(e) => {
                warn!("Undecodable message on {}: {}", self.name, e);
                return Some(codec::encode_error_envelope(
                    DECODE_ERROR,
                    Some(e.to_string().as_str()),
                    None,
                ));
            }
        };

        let result = self.invoke_method(call).await;
        codec::encode_result(&result)
    }
}

impl std::fmt::Debug for MethodChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodChannel")
            .field("name", &self.name)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl MethodCallHandler for Echo {
        async fn on_method_call(&self, call: MethodCall) -> MethodResult {
            match call.method.as_str() {
                "echo" => MethodResult::Success(call.arguments),
                _ => MethodResult::NotImplemented,
            }
        }
    }

    #[test]
    fn test_argument_lookup() {
        let call = MethodCall::new("m", json!({"uuid": "abc", "count": 3}));
        assert_eq!(call.argument::<String>("uuid"), Some("abc".to_string()));
        assert_eq!(call.argument::<u32>("count"), Some(3));
        assert_eq!(call.argument::<String>("count"), None);
        assert_eq!(call.argument::<String>("missing"), None);

        let no_map = MethodCall::new("m", json!("abc"));
        assert_eq!(no_map.argument::<String>("uuid"), None);
        assert_eq!(MethodCall::without_arguments("m").argument::<String>("uuid"), None);
    }

    #[test]
    fn test_result_helpers() {
        assert_eq!(MethodResult::success(true).as_bool(), Some(true));
        let err = MethodResult::error(INVALID_ARGUMENT, "UUID is required");
        assert_eq!(err.error_code(), Some(INVALID_ARGUMENT));
        assert!(!err.is_success());
        assert_eq!(MethodResult::NotImplemented.as_bool(), None);
    }

    #[tokio::test]
    async fn test_channel_without_handler() {
        let channel = MethodChannel::new("test/channel");
        let result = channel.invoke_method(MethodCall::without_arguments("echo")).await;
        assert_eq!(result, MethodResult::NotImplemented);
    }

    #[tokio::test]
    async fn test_channel_dispatch() {
        let mut channel = MethodChannel::new("test/channel");
        channel.set_method_call_handler(Arc::new(Echo));

        let result = channel
            .invoke_method(MethodCall::new("echo", json!([1, 2])))
            .await;
        assert_eq!(result, MethodResult::Success(json!([1, 2])));

        channel.clear_method_call_handler();
        let result = channel.invoke_method(MethodCall::new("echo", json!(1))).await;
        assert_eq!(result, MethodResult::NotImplemented);
    }

    #[tokio::test]
    async fn test_handle_message_bad_json() {
        let mut channel = MethodChannel::new("test/channel");
        channel.set_method_call_handler(Arc::new(Echo));

        let reply = channel
            .handle_message(Bytes::from_static(b"{not json"))
            .await
            .unwrap();
        let decoded = codec::decode_envelope(&reply).unwrap();
        assert_eq!(decoded.error_code(), Some(DECODE_ERROR));
    }
}
