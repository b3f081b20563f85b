//! Request and response envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vc_types::ProtocolError;

/// Incoming method call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolRequest {
    /// Caller-chosen request id, echoed in the response
    pub id: u64,
    /// Method name in format "Domain.method"
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Reply to a [`ProtocolRequest`]; exactly one of `result` / `error` is set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolResponse {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
}

impl ProtocolResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: ProtocolError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}
