//! Error types for docbridge

use thiserror::Error;

/// Result type alias for docbridge operations
pub type Result<T> = std::result::Result<T, DocBridgeError>;

/// Unified error type for all docbridge operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocBridgeError {
    /// Missing key, unreadable file or malformed value in the connection config
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure building or opening a client for the configured server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any failure surfaced by the underlying document-store driver
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation needed a document and the collection had none
    #[error("Not found: {0}")]
    NotFound(String),
}

impl DocBridgeError {
    /// Returns true if this error came from the configuration layer
    pub fn is_config(&self) -> bool {
        matches!(self, DocBridgeError::Config(_))
    }
}

impl From<serde_json::Error> for DocBridgeError {
    fn from(err: serde_json::Error) -> Self {
        DocBridgeError::Serialization(err.to_string())
    }
}

impl From<bson::ser::Error> for DocBridgeError {
    fn from(err: bson::ser::Error) -> Self {
        DocBridgeError::Serialization(format!("BSON serialization error: {}", err))
    }
}

impl From<bson::de::Error> for DocBridgeError {
    fn from(err: bson::de::Error) -> Self {
        DocBridgeError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for DocBridgeError {
    fn from(err: mongodb::error::Error) -> Self {
        DocBridgeError::Engine(err.to_string())
    }
}
