//! S3-compatible object storage provider.
//!
//! Talks to the S3 REST API directly with `SigV4` request signing, which keeps
//! the provider working against AWS, MinIO, R2, and friends without an SDK.
//! Objects are addressed path-style (`endpoint/bucket/key`). Listing uses
//! `list-type=2` with a `/` delimiter; the response is XML, and we only need
//! `<Key>` and `<Prefix>` values out of it, so extraction is a minimal tag
//! scan rather than a full parser.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::{Digest, Sha256};

use crate::config::S3Config;
use crate::{DirEntry, StorageError, StorageProvider};

type HmacSha256 = Hmac<Sha256>;

/// Storage provider backed by an S3-compatible bucket.
pub struct S3Provider {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    region: String,
    bucket: String,
    access_key: String,
    secret_key: String,
    content_root: String,
    uploads_root: String,
    public_base: Option<String>,
}

impl S3Provider {
    #[must_use]
    pub fn new(config: S3Config) -> Self {
        let endpoint = config.endpoint.trim_end_matches('/').to_owned();
        let host = host_of(&endpoint);
        Self {
            http: reqwest::Client::new(),
            endpoint,
            host,
            region: config.region,
            bucket: config.bucket,
            access_key: config.access_key,
            secret_key: config.secret_key,
            content_root: config.content_root,
            uploads_root: config.uploads_root,
            public_base: config.public_base,
        }
    }

    fn content_key(&self, path: &str) -> String {
        join_prefix(&self.content_root, path)
    }

    /// Send a signed request for one object key (no query string).
    async fn object_request(
        &self,
        method: Method,
        key: &str,
        payload: &[u8],
    ) -> Result<reqwest::Response, StorageError> {
        let canonical_uri = format!("/{}/{}", self.bucket, encode_key(key));
        let url = format!("{}{canonical_uri}", self.endpoint);
        let signed = sign_request(
            &self.access_key,
            &self.secret_key,
            &self.region,
            method.as_str(),
            &self.host,
            &canonical_uri,
            "",
            payload,
            Utc::now(),
        );

        let mut builder = self
            .http
            .request(method, &url)
            .header("Authorization", signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256);
        if !payload.is_empty() {
            builder = builder
                .header("Content-Type", "application/octet-stream")
                .body(payload.to_vec());
        }
        builder.send().await.map_err(|e| StorageError::Http {
            reason: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl StorageProvider for S3Provider {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let key = self.content_key(path);
        let resp = self.object_request(Method::GET, &key, b"").await?;
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

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let key = self.content_key(path);
        let resp = self.object_request(Method::PUT, &key, contents).await?;
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        // S3 DELETE is idempotent and answers 204 for missing keys, so probe
        // first to keep the uniform not-found contract.
        if !self.exists(path).await {
            return Err(StorageError::NotFound {
                path: path.to_owned(),
            });
        }
        let key = self.content_key(path);
        let resp = self.object_request(Method::DELETE, &key, b"").await?;
        if !resp.status().is_success() {
            return Err(api_error(path, resp).await);
        }
        Ok(())
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let prefix = if dir.is_empty() {
            join_prefix(&self.content_root, "")
        } else {
            format!("{}/", self.content_key(dir))
        };

        // Query keys sorted alphabetically, values percent-encoded.
        let canonical_uri = format!("/{}", self.bucket);
        let canonical_query = format!(
            "delimiter=%2F&list-type=2&prefix={}",
            urlencoding::encode(&prefix)
        );
        let url = format!("{}{canonical_uri}?{canonical_query}", self.endpoint);
        let signed = sign_request(
            &self.access_key,
            &self.secret_key,
            &self.region,
            "GET",
            &self.host,
            &canonical_uri,
            &canonical_query,
            b"",
            Utc::now(),
        );

        let resp = self
            .http
            .get(&url)
            .header("Authorization", signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
            .send()
            .await
            .map_err(|e| StorageError::Http {
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(api_error(dir, resp).await);
        }
        let body = resp.text().await.map_err(|e| StorageError::Http {
            reason: e.to_string(),
        })?;

        Ok(parse_listing(&body, &prefix, dir))
    }

    async fn exists(&self, path: &str) -> bool {
        let key = self.content_key(path);
        match self.object_request(Method::HEAD, &key, b"").await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let key = join_prefix(&self.uploads_root, filename);
        let resp = self.object_request(Method::PUT, &key, bytes).await?;
        if !resp.status().is_success() {
            return Err(api_error(filename, resp).await);
        }
        Ok(public_object_url(
            self.public_base.as_deref(),
            &self.endpoint,
            &self.bucket,
            &key,
        ))
    }
}

impl std::fmt::Debug for S3Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Provider")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

// ── SigV4 signing ────────────────────────────────────────────────────

struct SignedHeaders {
    authorization: String,
    amz_date: String,
    content_sha256: String,
}

const SIGNED_HEADER_NAMES: &str = "host;x-amz-content-sha256;x-amz-date";

#[allow(clippy::too_many_arguments)]
fn sign_request(
    access_key: &str,
    secret_key: &str,
    region: &str,
    method: &str,
    host: &str,
    canonical_uri: &str,
    canonical_query: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = now.format("%Y%m%d").to_string();
    let payload_hash = hex::encode(Sha256::digest(payload));

    let canonical_headers =
        format!("host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n");
    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{SIGNED_HEADER_NAMES}\n{payload_hash}"
    );

    let scope = format!("{datestamp}/{region}/s3/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let signing_key = derive_signing_key(secret_key, &datestamp, region);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={access_key}/{scope}, SignedHeaders={SIGNED_HEADER_NAMES}, Signature={signature}"
        ),
        amz_date,
        content_sha256: payload_hash,
    }
}

fn derive_signing_key(secret_key: &str, datestamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), datestamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, b"s3");
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC-SHA256 accepts any key length per RFC 2104, so new_from_slice
    // will never fail here.
    #[allow(clippy::unwrap_used)]
    let mut mac = HmacSha256::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// ── Helpers ──────────────────────────────────────────────────────────

fn join_prefix(root: &str, path: &str) -> String {
    if root.is_empty() {
        path.to_owned()
    } else if path.is_empty() {
        format!("{root}/")
    } else {
        format!("{root}/{path}")
    }
}

fn host_of(endpoint: &str) -> String {
    let rest = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    rest.split('/').next().unwrap_or(rest).to_owned()
}

/// Percent-encode each key segment, keeping `/` separators intact.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Public URL for an object, with the key percent-encoded the same way as
/// the signed request path.
fn public_object_url(base: Option<&str>, endpoint: &str, bucket: &str, key: &str) -> String {
    let base = base.map_or_else(|| format!("{endpoint}/{bucket}"), str::to_owned);
    format!("{}/{}", base.trim_end_matches('/'), encode_key(key))
}

async fn api_error(path: &str, resp: reqwest::Response) -> StorageError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StorageError::Api {
        status,
        path: path.to_owned(),
        message: error_message(body),
    }
}

/// S3 error bodies are XML with a `<Message>` element; fall back to the raw
/// body when it is missing.
fn error_message(body: String) -> String {
    extract_tag_values(&body, "Message")
        .into_iter()
        .next()
        .unwrap_or(body)
}

/// Pull direct children out of a `ListObjectsV2` response: `<Key>` values
/// under the prefix become files, `<Prefix>` values become directories.
/// `dir` is the content-root-relative directory the entries belong to.
fn parse_listing(xml: &str, prefix: &str, dir: &str) -> Vec<DirEntry> {
    let mut entries = Vec::new();

    for key in extract_tag_values(xml, "Key") {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        if !rest.is_empty() && !rest.contains('/') && rest.ends_with(".md") {
            entries.push(DirEntry::file(dir, rest));
        }
    }
    for common in extract_tag_values(xml, "Prefix") {
        // The listing echoes the request prefix back in a top-level
        // <Prefix> element; only CommonPrefixes children extend it.
        let Some(rest) = common.strip_prefix(prefix) else {
            continue;
        };
        let name = rest.trim_end_matches('/');
        if !name.is_empty() && !name.contains('/') {
            entries.push(DirEntry::dir(dir, name));
        }
    }

    entries.sort();
    entries.dedup();
    entries
}

fn extract_tag_values(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        rest = &rest[start + open.len()..];
        let Some(end) = rest.find(&close) else { break };
        values.push(xml_unescape(&rest[..end]));
        rest = &rest[end + close.len()..];
    }
    values
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().unwrap()
    }

    #[test]
    fn signature_is_deterministic() {
        let a = sign_request(
            "AKIA000",
            "secret",
            "us-east-1",
            "GET",
            "s3.example.com",
            "/bucket/content/a.md",
            "",
            b"",
            fixed_now(),
        );
        let b = sign_request(
            "AKIA000",
            "secret",
            "us-east-1",
            "GET",
            "s3.example.com",
            "/bucket/content/a.md",
            "",
            b"",
            fixed_now(),
        );
        assert_eq!(a.authorization, b.authorization);
        assert_eq!(a.amz_date, "20240501T123000Z");
    }

    #[test]
    fn signature_changes_with_secret() {
        let a = sign_request(
            "AKIA000", "one", "us-east-1", "GET", "h", "/b/k", "", b"", fixed_now(),
        );
        let b = sign_request(
            "AKIA000", "two", "us-east-1", "GET", "h", "/b/k", "", b"", fixed_now(),
        );
        assert_ne!(a.authorization, b.authorization);
    }

    #[test]
    fn authorization_carries_scope_and_headers() {
        let signed = sign_request(
            "AKIAEXAMPLE",
            "secret",
            "eu-west-2",
            "PUT",
            "minio.local:9000",
            "/bucket/content/a.md",
            "",
            b"body",
            fixed_now(),
        );
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20240501/eu-west-2/s3/aws4_request"
        ));
        assert!(signed
            .authorization
            .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        let signature = signed.authorization.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn payload_hash_matches_sha256() {
        let signed = sign_request(
            "ak", "sk", "us-east-1", "PUT", "h", "/b/k", "", b"hello", fixed_now(),
        );
        assert_eq!(
            signed.content_sha256,
            hex::encode(Sha256::digest(b"hello"))
        );
    }

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(host_of("https://s3.eu-west-2.amazonaws.com"), "s3.eu-west-2.amazonaws.com");
        assert_eq!(host_of("http://minio.local:9000/"), "minio.local:9000");
        assert_eq!(host_of("minio.local:9000"), "minio.local:9000");
    }

    #[test]
    fn listing_splits_files_and_dirs() {
        let xml = r#"<?xml version="1.0"?>
<ListBucketResult>
  <Prefix>content/</Prefix>
  <Contents><Key>content/about.md</Key></Contents>
  <Contents><Key>content/cover.png</Key></Contents>
  <CommonPrefixes><Prefix>content/posts/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        let entries = parse_listing(xml, "content/", "");
        assert_eq!(
            entries,
            vec![DirEntry::file("", "about.md"), DirEntry::dir("", "posts")]
        );
    }

    #[test]
    fn listing_carries_dir_relative_paths() {
        let xml = "<Contents><Key>content/posts/a.md</Key></Contents>\
                   <CommonPrefixes><Prefix>content/posts/drafts/</Prefix></CommonPrefixes>";
        let entries = parse_listing(xml, "content/posts/", "posts");
        assert_eq!(
            entries,
            vec![DirEntry::file("posts", "a.md"), DirEntry::dir("posts", "drafts")]
        );
        assert_eq!(entries[0].path, "posts/a.md");
        assert_eq!(entries[1].path, "posts/drafts");
    }

    #[test]
    fn listing_unescapes_entities() {
        let xml = "<Contents><Key>content/a&amp;b.md</Key></Contents>";
        let entries = parse_listing(xml, "content/", "");
        assert_eq!(entries, vec![DirEntry::file("", "a&b.md")]);
    }

    #[test]
    fn encode_key_preserves_separators() {
        assert_eq!(
            encode_key("content/hello world.md"),
            "content/hello%20world.md"
        );
    }

    #[test]
    fn error_message_comes_from_the_xml_body() {
        let body = "<Error><Code>NoSuchKey</Code>\
                    <Message>The specified key does not exist.</Message></Error>";
        assert_eq!(
            error_message(body.to_owned()),
            "The specified key does not exist."
        );
    }

    #[test]
    fn error_message_falls_back_to_the_raw_body() {
        assert_eq!(error_message("upstream exploded".to_owned()), "upstream exploded");
    }

    #[test]
    fn public_url_percent_encodes_the_key() {
        assert_eq!(
            public_object_url(
                None,
                "https://s3.example.com",
                "assets",
                "uploads/hello world.png"
            ),
            "https://s3.example.com/assets/uploads/hello%20world.png"
        );
    }

    #[test]
    fn public_url_prefers_the_configured_base() {
        assert_eq!(
            public_object_url(
                Some("https://cdn.example.com/"),
                "https://s3.example.com",
                "assets",
                "uploads/a.png"
            ),
            "https://cdn.example.com/uploads/a.png"
        );
    }
}
