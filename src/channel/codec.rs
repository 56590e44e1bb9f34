//! JSON method codec.
//!
//! Calls are encoded as `{"method": name, "args": arguments}`. Replies are
//! envelopes: `[result]` for success and `[code, message, details]` for
//! errors. Unimplemented methods get an empty reply.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::{MethodCall, MethodResult};
use crate::error::{Error, Result};

#[derive(Serialize, Deserialize)]
struct WireCall {
    method: String,
    #[serde(default)]
    args: Value,
}

/// Encode a call.
pub fn encode_method_call(call: &MethodCall) -> Bytes {
    let wire = serde_json::json!({
        "method": call.method,
        "args": call.arguments,
    });
    Bytes::from(wire.to_string())
}

/// Decode a call.
///
/// # Errors
///
/// Returns [`Error::Codec`] if the message is not a JSON object with a string
/// `method`.
pub fn decode_method_call(message: &[u8]) -> Result<MethodCall> {
    let wire: WireCall = serde_json::from_slice(message)?;
    Ok(MethodCall {
        method: wire.method,
        arguments: wire.args,
    })
}

/// Encode a success envelope.
pub fn encode_success_envelope(result: &Value) -> Bytes {
    Bytes::from(Value::Array(vec![result.clone()]).to_string())
}

/// Encode an error envelope.
pub fn encode_error_envelope(code: &str, message: Option<&str>, details: Option<&Value>) -> Bytes {
    let envelope = Value::Array(vec![
        Value::from(code),
        message.map(Value::from).unwrap_or(Value::Null),
        details.cloned().unwrap_or(Value::Null),
    ]);
    Bytes::from(envelope.to_string())
}

/// Encode any result; `None` for [`MethodResult::NotImplemented`].
pub fn encode_result(result: &MethodResult) -> Option<Bytes> {
    match result {
        MethodResult::Success(value) => Some(encode_success_envelope(value)),
        MethodResult::Error {
            code,
            message,
            details,
        } => Some(encode_error_envelope(
            code,
            message.as_deref(),
            details.as_ref(),
        )),
        MethodResult::NotImplemented => None,
    }
}

/// Decode a reply envelope. An empty reply decodes to
/// [`MethodResult::NotImplemented`].
///
/// # Errors
///
/// Returns an error if the reply is neither empty nor a one- or three-element
/// array.
pub fn decode_envelope(reply: &[u8]) -> Result<MethodResult> {
    if reply.is_empty() {
        return Ok(MethodResult::NotImplemented);
    }

    let envelope: Vec<Value> = serde_json::from_slice(reply)?;
    match envelope.as_slice() {
        [result] => Ok(MethodResult::Success(result.clone())),
        [Value::String(code), message, details] => Ok(MethodResult::Error {
            code: code.clone(),
            message: message.as_str().map(str::to_string),
            details: if details.is_null() {
                None
            } else {
                Some(details.clone())
            },
        }),
        _ => Err(Error::InvalidEnvelope {
            len: envelope.len(),
        }),
    }
}
