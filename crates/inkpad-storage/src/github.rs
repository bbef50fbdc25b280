//! GitHub repository provider.
//!
//! Content lives as files on a branch of a GitHub repository, manipulated
//! through the contents API. File bodies travel base64-encoded; updates and
//! deletes must quote the current blob SHA, so writes resolve it first.
//! Uploads land under the uploads prefix and are served from the raw host.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GitHubConfig;
use crate::{DirEntry, StorageError, StorageProvider};

const USER_AGENT: &str = concat!("inkpad/", env!("CARGO_PKG_VERSION"));

/// Storage provider backed by a GitHub repository branch.
pub struct GitHubProvider {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: String,
    content_root: String,
    uploads_root: String,
}

#[derive(Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct ContentsEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct PutResponse {
    #[serde(default)]
    content: Option<PutContent>,
}

#[derive(Deserialize)]
struct PutContent {
    #[serde(default)]
    download_url: Option<String>,
}

impl GitHubProvider {
    #[must_use]
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base,
            owner: config.owner,
            repo: config.repo,
            branch: config.branch,
            token: config.token,
            content_root: config.content_root,
            uploads_root: config.uploads_root,
        }
    }

    fn contents_url(&self, repo_path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            encode_path(repo_path)
        )
    }

    fn content_repo_path(&self, path: &str) -> String {
        join_prefix(&self.content_root, path)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.request_accept(method, url, "application/vnd.github+json")
    }

    fn request_accept(&self, method: Method, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("User-Agent", USER_AGENT)
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StorageError> {
        builder.send().await.map_err(|e| StorageError::Http {
            reason: e.to_string(),
        })
    }

    /// Fetch a file body through the raw media type. The contents API only
    /// inlines base64 bodies up to 1 MiB; larger blobs are served this way.
    async fn read_raw(&self, repo_path: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let builder = self
            .request_accept(
                Method::GET,
                &self.contents_url(repo_path),
                "application/vnd.github.raw",
            )
            .query(&[("ref", &self.branch)]);
        let resp = self.send(builder).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                path: path.to_owned(),
            });
        }
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }
        let bytes = resp.bytes().await.map_err(|e| StorageError::Http {
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    /// Fetch the blob SHA for a repo path, or `None` if the file is absent.
    async fn file_sha(&self, repo_path: &str, path: &str) -> Result<Option<String>, StorageError> {
        let builder = self
            .request(Method::GET, &self.contents_url(repo_path))
            .query(&[("ref", &self.branch)]);
        let resp = self.send(builder).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }
        let file: ContentsFile = resp.json().await.map_err(|e| StorageError::InvalidResponse {
            reason: format!("contents metadata for '{path}': {e}"),
        })?;
        Ok(Some(file.sha))
    }

    async fn put_contents(
        &self,
        repo_path: &str,
        path: &str,
        contents: &[u8],
    ) -> Result<Option<String>, StorageError> {
        let sha = self.file_sha(repo_path, path).await?;
        let message = if sha.is_some() {
            format!("Update {repo_path}")
        } else {
            format!("Create {repo_path}")
        };

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(contents),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("sha".to_owned(), Value::String(sha));
            }
        }

        let builder = self
            .request(Method::PUT, &self.contents_url(repo_path))
            .json(&body);
        let resp = self.send(builder).await?;
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }
        let put: PutResponse = resp.json().await.unwrap_or(PutResponse { content: None });
        Ok(put.content.and_then(|c| c.download_url))
    }
}

#[async_trait::async_trait]
impl StorageProvider for GitHubProvider {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let repo_path = self.content_repo_path(path);
        let builder = self
            .request(Method::GET, &self.contents_url(&repo_path))
            .query(&[("ref", &self.branch)]);
        let resp = self.send(builder).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                path: path.to_owned(),
            });
        }
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }

        let file: ContentsFile = resp.json().await.map_err(|e| StorageError::InvalidResponse {
            reason: format!("contents of '{path}': {e}"),
        })?;
        match inline_content(&file) {
            Some(raw) => decode_base64_body(raw).map_err(|e| StorageError::InvalidResponse {
                reason: format!("base64 content of '{path}': {e}"),
            }),
            None => self.read_raw(&repo_path, path).await,
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let repo_path = self.content_repo_path(path);
        self.put_contents(&repo_path, path, contents).await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let repo_path = self.content_repo_path(path);
        let sha = self
            .file_sha(&repo_path, path)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_owned(),
            })?;

        let body = serde_json::json!({
            "message": format!("Delete {repo_path}"),
            "sha": sha,
            "branch": self.branch,
        });
        let builder = self
            .request(Method::DELETE, &self.contents_url(&repo_path))
            .json(&body);
        let resp = self.send(builder).await?;
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }
        Ok(())
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let repo_dir = if dir.is_empty() {
            self.content_root.clone()
        } else {
            self.content_repo_path(dir)
        };
        let builder = self
            .request(Method::GET, &self.contents_url(&repo_dir))
            .query(&[("ref", &self.branch)]);
        let resp = self.send(builder).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(api_error(dir, resp).await);
        }

        let items: Vec<ContentsEntry> =
            resp.json().await.map_err(|e| StorageError::InvalidResponse {
                reason: format!("directory listing of '{dir}': {e}"),
            })?;

        let mut entries = Vec::new();
        for item in items {
            match item.kind.as_str() {
                "dir" => entries.push(DirEntry::dir(dir, item.name)),
                "file" if item.name.ends_with(".md") => {
                    entries.push(DirEntry::file(dir, item.name));
                }
                _ => {}
            }
        }
        entries.sort();
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> bool {
        let repo_path = self.content_repo_path(path);
        let builder = self
            .request(Method::GET, &self.contents_url(&repo_path))
            .query(&[("ref", &self.branch)]);
        match builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let repo_path = join_prefix(&self.uploads_root, filename);
        let download_url = self.put_contents(&repo_path, filename, bytes).await?;
        Ok(download_url.unwrap_or_else(|| {
            format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                self.owner, self.repo, self.branch, repo_path
            )
        }))
    }
}

impl std::fmt::Debug for GitHubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubProvider")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .finish_non_exhaustive()
    }
}

fn join_prefix(root: &str, path: &str) -> String {
    if root.is_empty() {
        path.to_owned()
    } else {
        format!("{root}/{path}")
    }
}

/// Percent-encode each path segment, keeping `/` separators intact.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The base64 body inlined in a contents response, when present and usable.
///
/// The API inlines bodies only up to 1 MiB; past that it answers with an
/// empty `content` and `encoding: "none"`, and the blob must be fetched
/// through the raw media type instead.
fn inline_content(file: &ContentsFile) -> Option<&str> {
    let raw = file.content.as_deref()?;
    if file.encoding.as_deref() != Some("base64") {
        return None;
    }
    if raw.is_empty() && file.size > 0 {
        return None;
    }
    Some(raw)
}

/// The contents API wraps base64 bodies at 60 columns; strip the newlines
/// before decoding.
fn decode_base64_body(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(compact)
}

async fn api_error(path: &str, resp: reqwest::Response) -> StorageError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    // GitHub error bodies carry a "message" field; fall back to the raw body.
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or(body);
    StorageError::Api {
        status,
        path: path.to_owned(),
        message,
    }
}
