//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    /// Transport/network error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a non-success HTTP status
    #[error("Node error ({status}): {message}")]
    Node {
        /// HTTP status code
        status: u16,
        /// Response body as text
        message: String,
    },

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// ABI encoding error
    #[error("ABI encoding error: {0}")]
    AbiEncode(String),

    /// ABI decoding error
    #[error("ABI decoding error: {0}")]
    AbiDecode(String),

    /// Event ABI does not describe the log or criteria it was paired with
    #[error("Invalid ABI item: {0}")]
    InvalidAbiItem(String),

    /// Transaction build error
    #[error("Transaction build error: {0}")]
    TxBuild(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// WebSocket connection failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Malformed node URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<thor_crypto::CryptoError> for SdkError {
    fn from(e: thor_crypto::CryptoError) -> Self {
        SdkError::SigningFailed(e.to_string())
    }
}

impl From<thor_primitives::AddressError> for SdkError {
    fn from(e: thor_primitives::AddressError) -> Self {
        SdkError::InvalidAddress(e.to_string())
    }
}

impl From<thor_primitives::HashError> for SdkError {
    fn from(e: thor_primitives::HashError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<url::ParseError> for SdkError {
    fn from(e: url::ParseError) -> Self {
        SdkError::InvalidUrl(e.to_string())
    }
}

/// SDK result alias
pub type SdkResult<T> = Result<T, SdkError>;
