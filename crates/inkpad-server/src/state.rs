//! Shared application state for the Inkpad server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the content store, credential checker,
//! session manager, and rate-limit store.

use std::sync::Arc;

use inkpad_core::content::ContentStore;
use inkpad_core::credentials::CredentialChecker;
use inkpad_core::ratelimit::RateLimitStore;
use inkpad_core::session::SessionManager;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Markdown content operations on top of the selected storage provider.
    pub content: ContentStore,
    /// Admin credential verification.
    pub credentials: CredentialChecker,
    /// Session token issue/verify.
    pub sessions: SessionManager,
    /// Login attempt bookkeeping keyed by client identifier.
    pub rate_limiter: Arc<dyn RateLimitStore>,
    /// Whether the server runs in production mode (controls cookie `Secure`).
    pub production: bool,
    /// Per-file size ceiling, also used to cap request bodies.
    pub max_file_size: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
