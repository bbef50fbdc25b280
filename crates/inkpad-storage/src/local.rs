//! Local filesystem provider.
//!
//! The development default: content lives under a content directory, uploads
//! under a sibling uploads directory. Upload URLs are root-relative
//! (`/uploads/<name>`) and are expected to be served by whatever fronts the
//! API in a local deployment.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{DirEntry, StorageError, StorageProvider};

/// Storage provider backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    content_root: PathBuf,
    uploads_root: PathBuf,
}

impl LocalProvider {
    /// Create a provider over the given content and uploads directories.
    /// Neither needs to exist yet; they are created on first write.
    #[must_use]
    pub fn new(content_root: impl Into<PathBuf>, uploads_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            uploads_root: uploads_root.into(),
        }
    }

    fn content_path(&self, path: &str) -> PathBuf {
        self.content_root.join(path)
    }
}

fn io_error(path: &str, err: &std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound {
            path: path.to_owned(),
        }
    } else {
        StorageError::Io {
            path: path.to_owned(),
            reason: err.to_string(),
        }
    }
}

async fn ensure_parent(full: &Path, path: &str) -> Result<(), StorageError> {
    if let Some(parent) = full.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::Io {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl StorageProvider for LocalProvider {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(self.content_path(path))
            .await
            .map_err(|e| io_error(path, &e))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let full = self.content_path(path);
        ensure_parent(&full, path).await?;
        tokio::fs::write(&full, contents)
            .await
            .map_err(|e| StorageError::Io {
                path: path.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.content_path(path))
            .await
            .map_err(|e| io_error(path, &e))
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let full = if dir.is_empty() {
            self.content_root.clone()
        } else {
            self.content_root.join(dir)
        };

        let mut read_dir = match tokio::fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::Io {
                    path: dir.to_owned(),
                    reason: e.to_string(),
                });
            }
        };

        let mut entries = Vec::new();
        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(StorageError::Io {
                        path: dir.to_owned(),
                        reason: e.to_string(),
                    });
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await.map_err(|e| StorageError::Io {
                path: dir.to_owned(),
                reason: e.to_string(),
            })?;
            if file_type.is_dir() {
                entries.push(DirEntry::dir(dir, name));
            } else if name.ends_with(".md") {
                entries.push(DirEntry::file(dir, name));
            }
        }

        entries.sort();
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.content_path(path))
            .await
            .unwrap_or(false)
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let full = self.uploads_root.join(filename);
        ensure_parent(&full, filename).await?;
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| StorageError::Io {
                path: filename.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(format!("/uploads/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dir: &tempfile::TempDir) -> LocalProvider {
        LocalProvider::new(dir.path().join("content"), dir.path().join("uploads"))
    }

    #[tokio::test]
    async fn write_creates_intermediate_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        local
            .write_file("posts/2024/deep.md", b"body")
            .await
            .unwrap();
        let bytes = local.read_file("posts/2024/deep.md").await.unwrap();
        assert_eq!(bytes, b"body");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        let err = local.read_file("ghost.md").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_then_read_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        local.write_file("a.md", b"x").await.unwrap();
        local.delete_file("a.md").await.unwrap();
        let err = local.read_file("a.md").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        let err = local.delete_file("ghost.md").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_filters_non_markdown_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        local.write_file("b.md", b"1").await.unwrap();
        local.write_file("a.md", b"2").await.unwrap();
        local.write_file("image.png", b"3").await.unwrap();
        local.write_file("posts/c.md", b"4").await.unwrap();

        let entries = local.list_dir("").await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry::file("", "a.md"),
                DirEntry::file("", "b.md"),
                DirEntry::dir("", "posts"),
            ]
        );
    }

    #[tokio::test]
    async fn list_subdir_carries_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        local.write_file("posts/a.md", b"1").await.unwrap();
        local.write_file("posts/2024/b.md", b"2").await.unwrap();

        let entries = local.list_dir("posts").await.unwrap();
        assert_eq!(
            entries,
            vec![DirEntry::dir("posts", "2024"), DirEntry::file("posts", "a.md")]
        );
        assert_eq!(entries[1].path, "posts/a.md");
        assert_eq!(entries[1].name, "a.md");
    }

    #[tokio::test]
    async fn list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        let entries = local.list_dir("not/there").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn exists_is_false_for_missing() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        assert!(!local.exists("nope.md").await);
        local.write_file("nope.md", b"x").await.unwrap();
        assert!(local.exists("nope.md").await);
    }

    #[tokio::test]
    async fn upload_lands_in_uploads_root() {
        let dir = tempfile::tempdir().unwrap();
        let local = provider(&dir);
        let url = local.upload("123-cat.png", b"meow").await.unwrap();
        assert_eq!(url, "/uploads/123-cat.png");
        let on_disk = tokio::fs::read(dir.path().join("uploads/123-cat.png"))
            .await
            .unwrap();
        assert_eq!(on_disk, b"meow");
    }
}
