//! RPC error types
//!
//! Handlers fail with an [`RpcError`]; the wire form is [`JsonRpcError`].
//! Callers can tell "not found" (`null` result) apart from every failure
//! kind below, and each kind keeps its own code.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use thor_sdk::SdkError;

/// JSON-RPC 2.0 and EIP-1193 error codes
pub mod error_code {
    /// Parse error: Invalid JSON was received
    pub const PARSE_ERROR: i64 = -32700;
    /// Invalid Request: The JSON is not a valid Request object
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i64 = -32603;

    // EIP-1193 provider codes
    /// No usable account for the request
    pub const UNAUTHORIZED: i64 = 4100;
    /// Method recognised but not supported
    pub const UNSUPPORTED_METHOD: i64 = 4200;
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Optional additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new JSON-RPC error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create error with additional data
    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error
    pub fn parse_error() -> Self {
        Self::new(error_code::PARSE_ERROR, "Parse error")
    }

    /// Invalid request
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_code::INVALID_REQUEST, message)
    }
}

/// Failure of one RPC method
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// Wrong arity or type of params; raised before any native call
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Envelope is not a valid JSON-RPC 2.0 request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No handler is registered under this name
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Registered on purpose, never implemented
    #[error("method not implemented: {0}")]
    NotImplemented(String),

    /// A native call failed or returned something unusable
    #[error("provider error: {message}")]
    Provider {
        /// Summary
        message: String,
        /// Native detail (status, body, revert data)
        data: Option<Value>,
    },

    /// Event ABI and criteria/log do not belong together
    #[error("invalid ABI item: {0}")]
    InvalidAbiItem(String),

    /// No signer available for the requested account
    #[error("missing signer: {0}")]
    MissingSigner(String),
}

impl RpcError {
    /// Invalid params
    pub fn invalid_params(message: impl Into<String>) -> Self {
        RpcError::InvalidParams(message.into())
    }

    /// Provider error without native detail
    pub fn provider(message: impl Into<String>) -> Self {
        RpcError::Provider {
            message: message.into(),
            data: None,
        }
    }

    /// Provider error carrying native detail
    pub fn provider_with_data(message: impl Into<String>, data: Value) -> Self {
        RpcError::Provider {
            message: message.into(),
            data: Some(data),
        }
    }

    /// Wire error code
    pub fn code(&self) -> i64 {
        match self {
            RpcError::InvalidParams(_) => error_code::INVALID_PARAMS,
            RpcError::InvalidRequest(_) => error_code::INVALID_REQUEST,
            RpcError::MethodNotFound(_) => error_code::METHOD_NOT_FOUND,
            RpcError::NotImplemented(_) => error_code::UNSUPPORTED_METHOD,
            RpcError::Provider { .. } => error_code::INTERNAL_ERROR,
            RpcError::InvalidAbiItem(_) => error_code::INTERNAL_ERROR,
            RpcError::MissingSigner(_) => error_code::UNAUTHORIZED,
        }
    }
}

impl From<RpcError> for JsonRpcError {
    fn from(e: RpcError) -> Self {
        let code = e.code();
        let message = e.to_string();
        match e {
            RpcError::Provider {
                data: Some(data), ..
            } => JsonRpcError::with_data(code, message, data),
            _ => JsonRpcError::new(code, message),
        }
    }
}

impl From<SdkError> for RpcError {
    fn from(e: SdkError) -> Self {
        match e {
            SdkError::InvalidAbiItem(message) => RpcError::InvalidAbiItem(message),
            SdkError::Node { status, message } => RpcError::provider_with_data(
                format!("node returned {}", status),
                json!({ "status": status, "message": message }),
            ),
            other => RpcError::provider(other.to_string()),
        }
    }
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Error Code Tests =====

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code::PARSE_ERROR, -32700);
        assert_eq!(error_code::INVALID_REQUEST, -32600);
        assert_eq!(error_code::METHOD_NOT_FOUND, -32601);
        assert_eq!(error_code::INVALID_PARAMS, -32602);
        assert_eq!(error_code::INTERNAL_ERROR, -32603);
        assert_eq!(error_code::UNAUTHORIZED, 4100);
        assert_eq!(error_code::UNSUPPORTED_METHOD, 4200);
    }

    #[test]
    fn test_kinds_have_distinct_codes() {
        assert_eq!(RpcError::invalid_params("x").code(), -32602);
        assert_eq!(RpcError::NotImplemented("eth_hashrate".into()).code(), 4200);
        assert_eq!(RpcError::provider("x").code(), -32603);
        assert_eq!(RpcError::MissingSigner("x".into()).code(), 4100);
        assert_eq!(RpcError::MethodNotFound("x".into()).code(), -32601);
    }

    // ===== Conversion Tests =====

    #[test]
    fn test_native_error_becomes_provider_error() {
        let err: RpcError = SdkError::Node {
            status: 400,
            message: "revision: invalid".into(),
        }
        .into();
        match &err {
            RpcError::Provider { data: Some(data), .. } => {
                assert_eq!(data["status"], 400);
                assert_eq!(data["message"], "revision: invalid");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let wire: JsonRpcError = err.into();
        assert_eq!(wire.code, error_code::INTERNAL_ERROR);
        assert!(wire.data.is_some());

        let err: RpcError = SdkError::Transport("timed out".into()).into();
        assert!(matches!(err, RpcError::Provider { data: None, .. }));
    }

    #[test]
    fn test_abi_error_keeps_kind() {
        let err: RpcError = SdkError::InvalidAbiItem("topic0 mismatch".into()).into();
        assert_eq!(err, RpcError::InvalidAbiItem("topic0 mismatch".into()));
    }

    // ===== JsonRpcError Serialization Tests =====

    #[test]
    fn test_json_rpc_error_serialize_without_data() {
        let err: JsonRpcError = RpcError::invalid_params("test").into();
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\":-32602"));
        assert!(json.contains("\"message\":\"invalid params: test\""));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_json_rpc_error_parse_error() {
        let err = JsonRpcError::parse_error();
        assert_eq!(err.code, error_code::PARSE_ERROR);
        assert_eq!(err.message, "Parse error");
    }
}
