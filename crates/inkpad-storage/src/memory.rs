//! In-memory storage provider for testing.
//!
//! Stores all content in `BTreeMap`s behind a `RwLock`. Nothing is persistent
//! and nothing touches disk, which makes this the provider of choice for unit
//! tests and the server's integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{DirEntry, StorageError, StorageProvider};

/// An in-memory storage provider backed by `BTreeMap`s.
///
/// Thread-safe and async-compatible. Clones share state, so a test can keep
/// one handle while the server under test owns another.
///
/// # Examples
///
/// ```
/// # use inkpad_storage::{MemoryProvider, StorageProvider};
/// # #[tokio::main]
/// # async fn main() {
/// let provider = MemoryProvider::new();
/// provider.write_file("posts/hello.md", b"# Hello").await.unwrap();
/// let bytes = provider.read_file("posts/hello.md").await.unwrap();
/// assert_eq!(bytes, b"# Hello");
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    uploads: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryProvider {
    /// Create a new empty in-memory provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an uploaded binary back out, for test assertions.
    pub async fn uploaded(&self, filename: &str) -> Option<Vec<u8>> {
        let uploads = self.uploads.read().await;
        uploads.get(filename).cloned()
    }
}

#[async_trait::async_trait]
impl StorageProvider for MemoryProvider {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let files = self.files.read().await;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_owned(),
            })
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let mut files = self.files.write().await;
        files.insert(path.to_owned(), contents.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let mut files = self.files.write().await;
        if files.remove(path).is_none() {
            return Err(StorageError::NotFound {
                path: path.to_owned(),
            });
        }
        Ok(())
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let files = self.files.read().await;
        let mut entries = BTreeSet::new();
        for key in files
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k)
        {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((child, _)) => {
                    entries.insert(DirEntry::dir(dir, child));
                }
                None if rest.ends_with(".md") => {
                    entries.insert(DirEntry::file(dir, rest));
                }
                None => {}
            }
        }

        Ok(entries.into_iter().collect())
    }

    async fn exists(&self, path: &str) -> bool {
        let files = self.files.read().await;
        files.contains_key(path)
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let mut uploads = self.uploads.write().await;
        uploads.insert(filename.to_owned(), bytes.to_vec());
        Ok(format!("/uploads/{filename}"))
    }
}
