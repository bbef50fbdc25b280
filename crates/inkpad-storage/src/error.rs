//! Storage error types.
//!
//! Every variant carries enough context to diagnose the problem without a
//! debugger. Remote providers flatten transport errors into reason strings so
//! callers are not coupled to the HTTP client.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested file does not exist.
    #[error("file not found: '{path}'")]
    NotFound { path: String },

    /// A local filesystem operation failed.
    #[error("io error on '{path}': {reason}")]
    Io { path: String, reason: String },

    /// A request to a remote provider failed before a response arrived.
    #[error("storage request failed: {reason}")]
    Http { reason: String },

    /// A remote provider answered with a non-success status.
    #[error("storage API returned {status} for '{path}': {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    /// A remote provider answered with a body we could not interpret.
    #[error("invalid storage response: {reason}")]
    InvalidResponse { reason: String },
}

impl StorageError {
    /// Whether this error means the file simply does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
