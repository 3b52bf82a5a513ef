//! Wire envelope shared by every Authentication Service endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw response envelope as the service serializes it.
///
/// Every endpoint, success or failure, wraps its payload in this shape.
/// `data` and `token` only appear on the operations that produce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A successful envelope, normalized for callers.
///
/// `data` is `Value::Null` when the service sent none, and `token` is only
/// present when the service issued a non-empty one.
#[derive(Debug, Clone)]
pub struct ServiceReply {
    pub message: Option<String>,
    pub data: Value,
    pub token: Option<String>,
}

impl ServiceReply {
    /// Deserialize the `data` payload into a typed value.
    pub fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}
