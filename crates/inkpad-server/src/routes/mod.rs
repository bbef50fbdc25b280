//! HTTP routes for the Inkpad API.
//!
//! [`router`] assembles the full surface: unauthenticated auth and health
//! endpoints, session-guarded content/list/upload endpoints, and the
//! hardening layers (trace, CORS, security headers, body cap).

pub mod auth;
pub mod content;
pub mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{require_session, resolve_client};
use crate::state::AppState;

/// Response body for state-changing endpoints that return no data.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the full API router.
pub fn router(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .nest("/api/content", content::router())
        .nest("/api/list", content::list_router())
        .nest("/api/upload", upload::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    let auth = Router::new()
        .nest("/api/auth", auth::router())
        .route_layer(axum_mw::from_fn(resolve_client));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    // Above the content-layer ceiling; the margin absorbs multipart and
    // JSON framing, leaving the size check to report oversized files.
    let body_limit = state.max_file_size.saturating_add(64 * 1024);

    Router::new()
        .merge(authenticated)
        .merge(auth)
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
