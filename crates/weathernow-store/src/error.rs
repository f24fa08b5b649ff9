//! Document store error types.

use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document was not found.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to touch this collection.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Credentials were missing or rejected.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The backend is unreachable or refused the call.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Non-success HTTP status from a remote store.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected document shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Whether the failure is transient and a user-initiated retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;
