//! Error types for the chain machinery itself

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised by the type registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A reconstruction function already exists for this type identifier
    #[error("chainable error type '{0}' already registered")]
    AlreadyRegistered(String),
}

/// Errors raised while an error serializes or rebuilds itself
#[derive(Debug, Error)]
pub enum ChainError {
    /// JSON payload could not be produced or parsed
    #[error("json payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload bytes were present but not usable
    #[error("invalid payload for '{ty}': {reason}")]
    InvalidPayload { ty: String, reason: String },
}
