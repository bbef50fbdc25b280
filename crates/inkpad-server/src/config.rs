//! Server configuration for Inkpad.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `INKPAD_*` environment variables. The
//! environment is read exactly once at startup; every component downstream
//! receives resolved values and never inspects the environment itself.

use std::net::SocketAddr;
use std::path::PathBuf;

use inkpad_core::ratelimit::SWEEP_INTERVAL_SECS;
use inkpad_core::validate::MAX_FILE_SIZE;
use inkpad_storage::{GitHubConfig, LocalConfig, S3Config, SelectionInputs};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Production mode: GitHub storage becomes eligible and session cookies
    /// are marked `Secure`.
    pub production: bool,
    /// Session signing secret. Required; the server refuses to start
    /// without one of at least 32 bytes.
    pub session_secret: Option<String>,
    /// Admin username, if configured.
    pub admin_username: Option<String>,
    /// Admin password, if configured.
    pub admin_password: Option<String>,
    /// Minimum accepted password length for login attempts.
    pub min_password_len: usize,
    /// Content root for the local provider.
    pub content_dir: PathBuf,
    /// Uploads root for the local provider.
    pub uploads_dir: PathBuf,
    /// GitHub storage settings, when a token is configured.
    pub github: Option<GitHubConfig>,
    /// S3-compatible storage settings, when fully configured.
    pub s3: Option<S3Config>,
    /// Seconds between rate-limit sweep ticks.
    pub sweep_interval_secs: u64,
    /// Per-file size ceiling in bytes.
    pub max_file_size: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on (binds to `0.0.0.0`)
    /// - `INKPAD_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `INKPAD_LOG_LEVEL` — log filter (default: `info`)
    /// - `INKPAD_ENV` — `production` enables production mode
    /// - `INKPAD_SESSION_SECRET` — session signing secret, at least 32 bytes (required)
    /// - `INKPAD_ADMIN_USERNAME` / `INKPAD_ADMIN_PASSWORD` — admin credentials
    /// - `INKPAD_MIN_PASSWORD_LEN` — minimum login password length (default: `0`)
    /// - `INKPAD_CONTENT_DIR` — local content root (default: `./content`)
    /// - `INKPAD_UPLOADS_DIR` — local uploads root (default: `./uploads`)
    /// - `INKPAD_GITHUB_TOKEN` / `INKPAD_GITHUB_OWNER` / `INKPAD_GITHUB_REPO` —
    ///   GitHub storage (all three required to enable it)
    /// - `INKPAD_GITHUB_BRANCH` — branch to commit to (default: `main`)
    /// - `INKPAD_S3_ENDPOINT` / `INKPAD_S3_BUCKET` / `INKPAD_S3_ACCESS_KEY` /
    ///   `INKPAD_S3_SECRET_KEY` — S3 storage (all four required to enable it)
    /// - `INKPAD_S3_REGION` — signing region (default: `us-east-1`)
    /// - `INKPAD_S3_PUBLIC_URL` — public base URL for uploaded assets (optional)
    /// - `INKPAD_SWEEP_INTERVAL` — seconds between rate-limit sweeps (default: `300`)
    /// - `INKPAD_MAX_FILE_SIZE` — per-file size ceiling in bytes (default: 10 MiB)
    #[must_use]
    pub fn from_env() -> Self {
        // Priority: INKPAD_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Ok(addr) = std::env::var("INKPAD_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080)))
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(8080);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 8080))
        };

        let log_level = std::env::var("INKPAD_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        let production = std::env::var("INKPAD_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let session_secret = std::env::var("INKPAD_SESSION_SECRET").ok();
        let admin_username = std::env::var("INKPAD_ADMIN_USERNAME").ok();
        let admin_password = std::env::var("INKPAD_ADMIN_PASSWORD").ok();

        let min_password_len = std::env::var("INKPAD_MIN_PASSWORD_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let content_dir = std::env::var("INKPAD_CONTENT_DIR")
            .map_or_else(|_| PathBuf::from("./content"), PathBuf::from);
        let uploads_dir = std::env::var("INKPAD_UPLOADS_DIR")
            .map_or_else(|_| PathBuf::from("./uploads"), PathBuf::from);

        // GitHub storage — enabled when token, owner, and repo are all set.
        let github = match (
            std::env::var("INKPAD_GITHUB_TOKEN"),
            std::env::var("INKPAD_GITHUB_OWNER"),
            std::env::var("INKPAD_GITHUB_REPO"),
        ) {
            (Ok(token), Ok(owner), Ok(repo)) => Some(GitHubConfig {
                token,
                owner,
                repo,
                branch: std::env::var("INKPAD_GITHUB_BRANCH")
                    .unwrap_or_else(|_| "main".to_owned()),
                api_base: "https://api.github.com".to_owned(),
                content_root: "content".to_owned(),
                uploads_root: "uploads".to_owned(),
            }),
            _ => None,
        };

        // S3 storage — enabled when endpoint, bucket, and both keys are set.
        let s3 = match (
            std::env::var("INKPAD_S3_ENDPOINT"),
            std::env::var("INKPAD_S3_BUCKET"),
            std::env::var("INKPAD_S3_ACCESS_KEY"),
            std::env::var("INKPAD_S3_SECRET_KEY"),
        ) {
            (Ok(endpoint), Ok(bucket), Ok(access_key), Ok(secret_key)) => Some(S3Config {
                endpoint,
                region: std::env::var("INKPAD_S3_REGION")
                    .unwrap_or_else(|_| "us-east-1".to_owned()),
                bucket,
                access_key,
                secret_key,
                public_base: std::env::var("INKPAD_S3_PUBLIC_URL").ok(),
                content_root: "content".to_owned(),
                uploads_root: "uploads".to_owned(),
            }),
            _ => None,
        };

        let sweep_interval_secs = std::env::var("INKPAD_SWEEP_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SWEEP_INTERVAL_SECS);

        let max_file_size = std::env::var("INKPAD_MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MAX_FILE_SIZE);

        Self {
            bind_addr,
            log_level,
            production,
            session_secret,
            admin_username,
            admin_password,
            min_password_len,
            content_dir,
            uploads_dir,
            github,
            s3,
            sweep_interval_secs,
            max_file_size,
        }
    }

    /// Assemble the inputs the storage selection policy looks at.
    #[must_use]
    pub fn selection_inputs(&self) -> SelectionInputs {
        SelectionInputs {
            s3: self.s3.clone(),
            github: self.github.clone(),
            local: LocalConfig {
                content_dir: self.content_dir.clone(),
                uploads_dir: self.uploads_dir.clone(),
            },
            production: self.production,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("production", &self.production)
            .field("session_secret", &"[REDACTED]")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"[REDACTED]")
            .field("min_password_len", &self.min_password_len)
            .field("content_dir", &self.content_dir)
            .field("uploads_dir", &self.uploads_dir)
            .field("github", &self.github)
            .field("s3", &self.s3)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("max_file_size", &self.max_file_size)
            .finish()
    }
}
