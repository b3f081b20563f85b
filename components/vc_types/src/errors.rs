// Error types
// Host capability failures, engine errors, and JSON-RPC 2.0 protocol errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::node::NodeId;

/// Failure reported by a host capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// Node handle does not resolve to a live node
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Operation requires an element
    #[error("Node is not an element: {0}")]
    NotAnElement(NodeId),

    /// Capability is missing or currently unusable
    #[error("Host capability unavailable: {0}")]
    Unavailable(String),

    /// Best-effort sink rejected a write
    #[error("Sink failed: {0}")]
    SinkFailed(String),
}

/// Errors that can occur in visual completeness operations
#[derive(Error, Debug)]
pub enum VcError {
    /// No measurement session has been started
    #[error("No active measurement session")]
    SessionNotActive,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Host capability error
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Protocol error in JSON-RPC 2.0 form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolError {
    /// Error code (JSON-RPC standard codes)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Protocol Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Invalid request (-32600)
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request")
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        let method = method.into();
        Self::with_data(
            -32601,
            "Method not found",
            serde_json::json!({ "method": method }),
        )
    }

    /// Invalid params (-32602)
    pub fn invalid_params(details: impl Into<String>) -> Self {
        let details = details.into();
        Self::with_data(
            -32602,
            "Invalid params",
            serde_json::json!({ "details": details }),
        )
    }

    /// Internal error (-32603)
    pub fn internal_error(details: impl Into<String>) -> Self {
        let details = details.into();
        Self::with_data(
            -32603,
            "Internal error",
            serde_json::json!({ "details": details }),
        )
    }

    /// Server error (-32000 to -32099); out-of-range codes fall back to -32000
    pub fn server_error(code: i32, message: impl Into<String>) -> Self {
        let code = if (-32099..=-32000).contains(&code) {
            code
        } else {
            -32000
        };
        Self::new(code, message)
    }
}

impl From<VcError> for ProtocolError {
    fn from(error: VcError) -> Self {
        match error {
            VcError::SessionNotActive => ProtocolError::server_error(-32001, error.to_string()),
            VcError::InvalidConfiguration(msg) => ProtocolError::invalid_params(msg),
            VcError::Host(e) => ProtocolError::server_error(-32000, e.to_string()),
            VcError::Serialization(e) => ProtocolError::internal_error(e.to_string()),
        }
    }
}
