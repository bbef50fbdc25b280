//! Markdown content on top of a storage provider.
//!
//! Every operation validates its path before touching storage. Size
//! ceilings are enforced twice: on serialized output before a write, and on
//! raw bytes after a read, so content grown oversized outside this process
//! is still refused.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use inkpad_storage::{EntryKind, StorageProvider};

use crate::error::ContentError;
use crate::frontmatter::{self, Document, Frontmatter};
use crate::validate::{
    sanitize_frontmatter, validate_file_path, validate_file_size, MAX_FILE_SIZE,
};

/// Reads and writes markdown documents through a storage provider.
#[derive(Clone)]
pub struct ContentStore {
    provider: Arc<dyn StorageProvider>,
    max_file_size: usize,
}

impl ContentStore {
    /// Create a store with the default 10 MiB size ceiling.
    #[must_use]
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self::with_max_file_size(provider, MAX_FILE_SIZE)
    }

    /// Create a store with a custom size ceiling.
    #[must_use]
    pub fn with_max_file_size(provider: Arc<dyn StorageProvider>, max_file_size: usize) -> Self {
        Self {
            provider,
            max_file_size,
        }
    }

    /// Read and parse the document at `path`.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Validate`] if the path is unsafe or the file
    ///   exceeds the size ceiling.
    /// - [`ContentError::Storage`] if the file is missing or the backend
    ///   fails.
    pub async fn get(&self, path: &str) -> Result<Document, ContentError> {
        let path = validate_file_path(path)?;
        let bytes = self.provider.read_file(&path).await?;
        validate_file_size(bytes.len(), self.max_file_size)?;
        let raw = String::from_utf8_lossy(&bytes);
        Ok(frontmatter::parse(&raw))
    }

    /// Sanitize, serialize, and write a document to `path`.
    ///
    /// The size ceiling applies to the serialized output, so oversized
    /// writes are refused before anything reaches storage.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Validate`] if the path is unsafe or the output
    ///   exceeds the size ceiling.
    /// - [`ContentError::Frontmatter`] if the metadata cannot be rendered.
    /// - [`ContentError::Storage`] if the backend fails.
    pub async fn save(
        &self,
        path: &str,
        data: &Frontmatter,
        body: &str,
    ) -> Result<(), ContentError> {
        let path = validate_file_path(path)?;
        let data = sanitize_frontmatter(data);
        let raw = frontmatter::stringify(&data, body)?;
        validate_file_size(raw.len(), self.max_file_size)?;

        self.provider.write_file(&path, raw.as_bytes()).await?;
        info!(path = %path, bytes = raw.len(), "content saved");
        Ok(())
    }

    /// Delete the document at `path`.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Validate`] if the path is unsafe.
    /// - [`ContentError::Storage`] if the file is missing or the backend
    ///   fails.
    pub async fn delete(&self, path: &str) -> Result<(), ContentError> {
        let path = validate_file_path(path)?;
        self.provider.delete_file(&path).await?;
        info!(path = %path, "content deleted");
        Ok(())
    }

    /// List markdown file names directly under `dir`.
    ///
    /// An empty `dir` lists the content root. Subdirectories are filtered
    /// out; only bare file names are returned. A missing directory is an
    /// empty list, not an error.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Validate`] if a non-empty `dir` is unsafe.
    /// - [`ContentError::Storage`] if the backend fails.
    pub async fn list(&self, dir: &str) -> Result<Vec<String>, ContentError> {
        let dir = if dir.is_empty() {
            String::new()
        } else {
            validate_file_path(dir)?
        };

        let entries = self.provider.list_dir(&dir).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::File)
            .map(|entry| entry.name)
            .collect())
    }

    /// Whether a document exists at `path`. Backend errors count as
    /// "does not exist".
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Validate`] if the path is unsafe.
    pub async fn exists(&self, path: &str) -> Result<bool, ContentError> {
        let path = validate_file_path(path)?;
        Ok(self.provider.exists(&path).await)
    }

    /// Store an uploaded asset and return its public URL.
    ///
    /// Uploads live in a namespace separate from content; `filename` goes
    /// through the same path validation as content paths.
    ///
    /// # Errors
    ///
    /// - [`ContentError::Validate`] if the filename is unsafe or the
    ///   payload exceeds the size ceiling.
    /// - [`ContentError::Storage`] if the backend fails.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ContentError> {
        let filename = validate_file_path(filename)?;
        validate_file_size(bytes.len(), self.max_file_size)?;

        let url = self.provider.upload(&filename, bytes).await?;
        info!(filename = %filename, bytes = bytes.len(), "upload stored");
        Ok(url)
    }
}

impl fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStore")
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use inkpad_storage::MemoryProvider;

    use crate::error::ValidateError;

    use super::*;

    fn store() -> (ContentStore, MemoryProvider) {
        let provider = MemoryProvider::new();
        (ContentStore::new(Arc::new(provider.clone())), provider)
    }

    fn data(value: serde_json::Value) -> Frontmatter {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let (store, _) = store();
        store
            .save("a/b.md", &data(json!({"title": "T"})), "body")
            .await
            .unwrap();

        let doc = store.get("a/b.md").await.unwrap();
        assert_eq!(
            serde_json::Value::Object(doc.frontmatter),
            json!({"title": "T"})
        );
        assert_eq!(doc.body, "body");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (store, _) = store();
        let err = store.get("missing.md").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn traversal_never_reaches_storage() {
        let (store, provider) = store();
        let err = store
            .save("../evil.md", &Frontmatter::new(), "x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Validate(ValidateError::PathTraversal)
        ));
        assert!(!provider.exists("../evil.md").await);

        assert!(store.get("blog/../../etc/passwd").await.is_err());
        assert!(store.delete("..").await.is_err());
        assert!(store.list("../..").await.is_err());
        assert!(store.exists("a/../b.md").await.is_err());
    }

    #[tokio::test]
    async fn save_normalizes_the_path() {
        let (store, _) = store();
        store
            .save("./blog//post.md", &Frontmatter::new(), "x")
            .await
            .unwrap();
        assert!(store.exists("blog/post.md").await.unwrap());
    }

    #[tokio::test]
    async fn save_sanitizes_frontmatter() {
        let (store, _) = store();
        store
            .save(
                "post.md",
                &data(json!({"bad key!": 1, "ok-key": "a\u{0}b"})),
                "body",
            )
            .await
            .unwrap();

        let doc = store.get("post.md").await.unwrap();
        assert_eq!(
            serde_json::Value::Object(doc.frontmatter),
            json!({"ok-key": "ab"})
        );
    }

    #[tokio::test]
    async fn oversized_save_is_refused_before_writing() {
        let provider = MemoryProvider::new();
        let store = ContentStore::with_max_file_size(Arc::new(provider.clone()), 64);
        let body = "x".repeat(200);

        let err = store
            .save("big.md", &Frontmatter::new(), &body)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Validate(ValidateError::FileTooLarge { .. })
        ));
        assert!(!provider.exists("big.md").await);
    }

    #[tokio::test]
    async fn oversized_read_is_refused() {
        let provider = MemoryProvider::new();
        let store = ContentStore::with_max_file_size(Arc::new(provider.clone()), 64);
        let body = "y".repeat(200);
        provider.write_file("grown.md", body.as_bytes()).await.unwrap();

        let err = store.get("grown.md").await.unwrap_err();
        assert!(matches!(
            err,
            ContentError::Validate(ValidateError::FileTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_document() {
        let (store, _) = store();
        store.save("gone.md", &Frontmatter::new(), "x").await.unwrap();
        store.delete("gone.md").await.unwrap();

        assert!(store.get("gone.md").await.unwrap_err().is_not_found());
        assert!(store.delete("gone.md").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn list_returns_only_markdown_file_names() {
        let (store, _) = store();
        store.save("blog/a.md", &Frontmatter::new(), "x").await.unwrap();
        store.save("blog/b.md", &Frontmatter::new(), "x").await.unwrap();
        store
            .save("blog/drafts/c.md", &Frontmatter::new(), "x")
            .await
            .unwrap();

        let names = store.list("blog").await.unwrap();
        assert_eq!(names, vec!["a.md".to_owned(), "b.md".to_owned()]);
    }

    #[tokio::test]
    async fn list_of_missing_directory_is_empty() {
        let (store, _) = store();
        assert!(store.list("nowhere").await.unwrap().is_empty());
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exists_reflects_storage() {
        let (store, _) = store();
        assert!(!store.exists("later.md").await.unwrap());
        store.save("later.md", &Frontmatter::new(), "x").await.unwrap();
        assert!(store.exists("later.md").await.unwrap());
    }

    #[tokio::test]
    async fn upload_returns_the_public_url() {
        let (store, provider) = store();
        let url = store.upload("img.png", b"\x89PNG").await.unwrap();
        assert_eq!(url, "/uploads/img.png");
        assert_eq!(provider.uploaded("img.png").await, Some(b"\x89PNG".to_vec()));
    }

    #[tokio::test]
    async fn oversized_upload_is_refused() {
        let provider = MemoryProvider::new();
        let store = ContentStore::with_max_file_size(Arc::new(provider), 4);
        let err = store.upload("img.png", b"too big").await.unwrap_err();
        assert!(matches!(
            err,
            ContentError::Validate(ValidateError::FileTooLarge { .. })
        ));
    }
}
