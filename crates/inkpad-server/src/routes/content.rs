//! Content routes: `/api/content/{*path}` and `/api/list[/{*path}]`
//!
//! Thin composition over the content store; path validation, sanitization,
//! and size enforcement all happen there.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use inkpad_core::frontmatter::Document;

use crate::error::AppError;
use crate::routes::SuccessResponse;
use crate::state::AppState;

/// Build the `/api/content` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/{*path}",
        get(get_content).post(save_content).delete(delete_content),
    )
}

/// Build the `/api/list` router.
pub fn list_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_root))
        .route("/{*path}", get(list_dir))
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<String>,
}

/// Read a document. Missing paths are `404`.
async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<Document>, AppError> {
    let doc = state.content.get(&path).await?;
    Ok(Json(doc))
}

/// Create or overwrite a document.
async fn save_content(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Json(doc): Json<Document>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.content.save(&path, &doc.frontmatter, &doc.body).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Delete a document. Missing paths are `404`.
async fn delete_content(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.content.delete(&path).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// List markdown files at the content root.
async fn list_root(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse>, AppError> {
    let entries = state.content.list("").await?;
    Ok(Json(ListResponse { entries }))
}

/// List markdown files directly under a subdirectory.
async fn list_dir(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<ListResponse>, AppError> {
    let entries = state.content.list(&path).await?;
    Ok(Json(ListResponse { entries }))
}
