//! Storage selection.
//!
//! Which provider serves content is a startup decision. The server resolves
//! its environment once into [`SelectionInputs`], and [`StorageConfig::select`]
//! applies the priority rules: S3 when fully configured, GitHub in production
//! when a token is present, local disk otherwise. Nothing here reads the
//! environment, which keeps the policy testable without process-global state.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::{GitHubProvider, LocalProvider, S3Provider, StorageProvider};

/// Local filesystem settings.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub content_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

/// GitHub repository settings. Built only when a token is configured.
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub api_base: String,
    pub content_root: String,
    pub uploads_root: String,
}

/// S3-compatible settings. Built only when endpoint, bucket, and both keys
/// are configured.
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base URL for serving uploads (a CDN in front of the bucket). Defaults
    /// to path-style bucket URLs when unset.
    pub public_base: Option<String>,
    pub content_root: String,
    pub uploads_root: String,
}

/// Everything the selection policy looks at, resolved by the caller.
#[derive(Debug)]
pub struct SelectionInputs {
    pub s3: Option<S3Config>,
    pub github: Option<GitHubConfig>,
    pub local: LocalConfig,
    pub production: bool,
}

/// The provider the selection policy settled on.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local(LocalConfig),
    GitHub(GitHubConfig),
    S3(S3Config),
}

impl StorageConfig {
    /// Apply the provider priority rules. Every outcome is logged so a
    /// misconfigured deployment shows its fallback in the startup output
    /// instead of silently writing to local disk.
    #[must_use]
    pub fn select(inputs: SelectionInputs) -> Self {
        if let Some(s3) = inputs.s3 {
            info!(provider = "s3", bucket = %s3.bucket, "storage provider selected");
            return Self::S3(s3);
        }
        match inputs.github {
            Some(github) if inputs.production => {
                info!(
                    provider = "github",
                    owner = %github.owner,
                    repo = %github.repo,
                    branch = %github.branch,
                    "storage provider selected"
                );
                return Self::GitHub(github);
            }
            Some(_) => {
                info!("github storage is configured but only used in production, using local disk");
            }
            None if inputs.production => {
                warn!("production deployment without S3 or GitHub storage, falling back to local disk");
            }
            None => {}
        }
        info!(
            provider = "local",
            content_dir = %inputs.local.content_dir.display(),
            "storage provider selected"
        );
        Self::Local(inputs.local)
    }

    /// Construct the provider this configuration names.
    #[must_use]
    pub fn build(self) -> Arc<dyn StorageProvider> {
        match self {
            Self::Local(cfg) => Arc::new(LocalProvider::new(cfg.content_dir, cfg.uploads_dir)),
            Self::GitHub(cfg) => Arc::new(GitHubProvider::new(cfg)),
            Self::S3(cfg) => Arc::new(S3Provider::new(cfg)),
        }
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
