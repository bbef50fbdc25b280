//! Error types for `inkpad-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Auth and session errors never include credential or key
//! material — only the category of failure.

use inkpad_storage::StorageError;

/// Errors from input validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidateError {
    /// The path is empty, or empty once normalized.
    #[error("path is empty")]
    EmptyPath,

    /// The path contains a null byte.
    #[error("path contains a null byte")]
    NullByte,

    /// The path contains a `..` traversal sequence.
    #[error("path contains a traversal sequence")]
    PathTraversal,

    /// The path is absolute.
    #[error("absolute paths are not allowed")]
    AbsolutePath,

    /// The path contains a character from the forbidden set `<>:"|?*`.
    #[error("path contains a forbidden character")]
    ForbiddenCharacter,

    /// A path segment names a reserved Windows device (CON, NUL, COM1, ...).
    #[error("path uses a reserved device name")]
    ReservedDeviceName,

    /// The username is empty, too long, or has characters outside `[a-zA-Z0-9_-]`.
    #[error("username must be 1-100 characters from [a-zA-Z0-9_-]")]
    InvalidUsername,

    /// The password is empty or outside the accepted length range.
    #[error("password length is outside the accepted range")]
    InvalidPassword,

    /// The payload exceeds the configured size ceiling.
    #[error("file size {size} exceeds the limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },
}

/// Errors from credential verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No admin credentials are configured. This is a deployment error,
    /// not a failed login.
    #[error("admin credentials are not configured")]
    Misconfigured,
}

/// Errors from session token operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The signing secret is shorter than the required minimum.
    #[error("session secret too short: need at least {min} bytes, got {actual}")]
    WeakSecret { min: usize, actual: usize },

    /// Serializing the session payload failed.
    #[error("session encoding failed: {reason}")]
    Encode { reason: String },
}

/// Errors from frontmatter serialization.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    /// The metadata map could not be rendered as YAML.
    #[error("frontmatter serialization failed: {reason}")]
    Serialize { reason: String },
}

/// Errors from the content layer.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Input validation rejected the request.
    #[error("content validation error: {0}")]
    Validate(#[from] ValidateError),

    /// The storage provider returned an error.
    #[error("content storage error: {0}")]
    Storage(#[from] StorageError),

    /// Frontmatter serialization failed.
    #[error("content frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

impl ContentError {
    /// Whether this error is a missing-file report from storage.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_not_found())
    }
}
