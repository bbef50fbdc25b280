//! Storage provider abstraction for inkpad.
//!
//! This crate defines the [`StorageProvider`] trait — a flat file-storage
//! interface that knows nothing about markdown, frontmatter, or sessions. The
//! content layer in `inkpad-core` wraps a provider and performs validation and
//! size enforcement before anything reaches this layer.
//!
//! Four implementations are provided:
//!
//! - [`LocalProvider`] — development default, backed by the local filesystem
//! - [`GitHubProvider`] — commits content to a GitHub repository branch
//! - [`S3Provider`] — S3-compatible object storage, signed with `SigV4`
//! - [`MemoryProvider`] — in-memory, for testing only
//!
//! Which provider runs is decided once at startup by
//! [`StorageConfig::select`], never per request.

mod config;
mod error;
mod github;
mod local;
mod memory;
mod s3;

pub use config::{GitHubConfig, LocalConfig, S3Config, SelectionInputs, StorageConfig};
pub use error::StorageError;
pub use github::GitHubProvider;
pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use s3::S3Provider;

use serde::Serialize;

/// What a directory listing entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// A single entry in a directory listing: a markdown file or a subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DirEntry {
    /// Path of the entry relative to the content root.
    pub path: String,
    /// Base name of the entry, without any directory prefix.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl DirEntry {
    /// A markdown file named `name` directly under `dir` (empty for the
    /// content root).
    #[must_use]
    pub fn file(dir: &str, name: impl Into<String>) -> Self {
        Self::new(dir, name.into(), EntryKind::File)
    }

    /// A subdirectory named `name` directly under `dir` (empty for the
    /// content root).
    #[must_use]
    pub fn dir(dir: &str, name: impl Into<String>) -> Self {
        Self::new(dir, name.into(), EntryKind::Dir)
    }

    fn new(dir: &str, name: String, kind: EntryKind) -> Self {
        let path = if dir.is_empty() {
            name.clone()
        } else {
            format!("{dir}/{name}")
        };
        Self { path, name, kind }
    }
}

/// A pluggable content storage provider.
///
/// Paths are relative UTF-8 strings using `/` as a separator (e.g.
/// `posts/hello.md`). Callers are expected to validate paths before handing
/// them to a provider; providers do not re-validate.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageProvider: Send + Sync + 'static {
    /// Read the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist, or a
    /// provider-specific error if the read fails.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a file, overwriting any existing contents. Intermediate
    /// directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns a provider-specific error if the write fails.
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist, or a
    /// provider-specific error if the delete fails.
    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;

    /// List the markdown files and subdirectories directly under `dir`.
    ///
    /// `dir` may be empty to list the content root. A missing directory is
    /// not an error — it lists as empty. Entries are sorted by name and
    /// non-markdown files are omitted.
    ///
    /// # Errors
    ///
    /// Returns a provider-specific error if the listing fails.
    async fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError>;

    /// Check whether a file exists.
    ///
    /// Never fails: any provider error is reported as `false`.
    async fn exists(&self, path: &str) -> bool;

    /// Store an uploaded binary under the uploads namespace and return its
    /// public URL. `filename` is the final name, already sanitized by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns a provider-specific error if the upload fails.
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError>;
}
