//! Input validation for paths, credentials, and frontmatter.
//!
//! Path validation is the primary defense against directory traversal.
//! Every storage operation goes through [`validate_file_path`] before a
//! path reaches a provider. The traversal check runs against the raw input,
//! before normalization, so `blog/../../etc/passwd` is rejected even though
//! cleanup would produce something harmless-looking.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ValidateError;
use crate::frontmatter::Frontmatter;

/// Maximum size for a single content file or upload (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum accepted username length.
pub const MAX_USERNAME_LENGTH: usize = 100;

/// Maximum accepted password length.
pub const MAX_PASSWORD_LENGTH: usize = 1000;

/// Characters that may not appear anywhere in a file path.
const FORBIDDEN_PATH_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Device names reserved by Windows. These are dangerous as file names
/// regardless of extension, so `con.md` is rejected along with `con`.
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com0", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
    "com8", "com9", "lpt0", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Minimum-length requirement applied on top of the basic password checks.
///
/// The default policy (`min_len: 0`) accepts any non-empty password up to
/// [`MAX_PASSWORD_LENGTH`] bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum accepted password length in bytes. Zero disables the check.
    pub min_len: usize,
}

/// Validate and normalize a content file path.
///
/// Returns the normalized path: `./` segments resolved, separators
/// collapsed, backslashes rewritten to `/`. Already-safe paths come back
/// unchanged.
///
/// # Errors
///
/// - [`ValidateError::EmptyPath`] — empty input, or nothing left after
///   normalization (`"."`, `"./"`).
/// - [`ValidateError::NullByte`] — embedded `\0`.
/// - [`ValidateError::PathTraversal`] — the input contains `..` anywhere.
/// - [`ValidateError::AbsolutePath`] — leading `/` or `\`.
/// - [`ValidateError::ForbiddenCharacter`] — any of `<>:"|?*`.
/// - [`ValidateError::ReservedDeviceName`] — a segment names a Windows
///   device, with or without an extension.
///
/// # Examples
///
/// ```
/// use inkpad_core::validate::validate_file_path;
///
/// assert_eq!(validate_file_path("blog/post.md").unwrap(), "blog/post.md");
/// assert_eq!(validate_file_path("./blog//post.md").unwrap(), "blog/post.md");
///
/// assert!(validate_file_path("blog/../../etc/passwd").is_err());
/// assert!(validate_file_path("/etc/passwd").is_err());
/// assert!(validate_file_path("con.md").is_err());
/// ```
pub fn validate_file_path(path: &str) -> Result<String, ValidateError> {
    if path.is_empty() {
        return Err(ValidateError::EmptyPath);
    }

    if path.contains('\0') {
        warn!(
            security_event = "path_rejected",
            path = %path.replace('\0', "\\0"),
            reason = "null_byte",
            "blocked path with null byte"
        );
        return Err(ValidateError::NullByte);
    }

    if path.contains("..") {
        warn!(
            security_event = "path_rejected",
            path = %path,
            reason = "traversal",
            "blocked path with traversal sequence"
        );
        return Err(ValidateError::PathTraversal);
    }

    if path.starts_with('/') || path.starts_with('\\') {
        warn!(
            security_event = "path_rejected",
            path = %path,
            reason = "absolute_path",
            "blocked absolute path"
        );
        return Err(ValidateError::AbsolutePath);
    }

    if path.contains(FORBIDDEN_PATH_CHARS) {
        warn!(
            security_event = "path_rejected",
            path = %path,
            reason = "forbidden_character",
            "blocked path with forbidden character"
        );
        return Err(ValidateError::ForbiddenCharacter);
    }

    for segment in path.split(['/', '\\']) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        // "con.md" -> "con"; ".hidden" has an empty stem and never matches.
        let stem = segment.split('.').next().unwrap_or(segment).to_lowercase();
        if RESERVED_DEVICE_NAMES.contains(&stem.as_str()) {
            warn!(
                security_event = "path_rejected",
                path = %path,
                segment = %segment,
                reason = "reserved_device_name",
                "blocked path with reserved device name"
            );
            return Err(ValidateError::ReservedDeviceName);
        }
    }

    let normalized = path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        return Err(ValidateError::EmptyPath);
    }

    Ok(normalized)
}

/// Validate a login username: non-empty, at most [`MAX_USERNAME_LENGTH`]
/// characters, drawn from `[a-zA-Z0-9_-]`.
///
/// # Errors
///
/// Returns [`ValidateError::InvalidUsername`] on any violation.
pub fn validate_username(username: &str) -> Result<(), ValidateError> {
    if username.is_empty()
        || username.len() > MAX_USERNAME_LENGTH
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidateError::InvalidUsername);
    }
    Ok(())
}

/// Validate a login password: non-empty, at most [`MAX_PASSWORD_LENGTH`]
/// bytes, and at least `policy.min_len` bytes.
///
/// Length is the only structural rule. Complexity requirements are an
/// operational concern, not enforced here.
///
/// # Errors
///
/// Returns [`ValidateError::InvalidPassword`] on any violation.
pub fn validate_password(password: &str, policy: PasswordPolicy) -> Result<(), ValidateError> {
    if password.is_empty()
        || password.len() > MAX_PASSWORD_LENGTH
        || password.len() < policy.min_len
    {
        return Err(ValidateError::InvalidPassword);
    }
    Ok(())
}

/// Check a payload size against a ceiling.
///
/// # Errors
///
/// Returns [`ValidateError::FileTooLarge`] if `size > limit`.
pub fn validate_file_size(size: usize, limit: usize) -> Result<(), ValidateError> {
    if size > limit {
        return Err(ValidateError::FileTooLarge { size, limit });
    }
    Ok(())
}

/// Clean a frontmatter map for storage.
///
/// Keys not matching `[a-zA-Z0-9_-]+` are dropped. Null bytes are stripped
/// from string values, including strings inside arrays. Nested mappings are
/// cleaned recursively with the same rules. Numbers, booleans, and null
/// pass through unchanged.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use inkpad_core::validate::sanitize_frontmatter;
///
/// let raw = json!({"bad key!": 1, "ok-key": "a\u{0}b"});
/// let clean = sanitize_frontmatter(raw.as_object().unwrap());
/// assert_eq!(serde_json::Value::Object(clean), json!({"ok-key": "ab"}));
/// ```
#[must_use]
pub fn sanitize_frontmatter(map: &Frontmatter) -> Frontmatter {
    let mut clean = Frontmatter::new();
    for (key, value) in map {
        if !is_valid_key(key) {
            debug!(key = %key.replace('\0', "\\0"), "dropped frontmatter key with invalid name");
            continue;
        }
        clean.insert(key.clone(), sanitize_value(value));
    }
    clean
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('\0', "")),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(sanitize_frontmatter(map)),
        other => other.clone(),
    }
}
