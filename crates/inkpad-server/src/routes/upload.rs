//! Upload route: `/api/upload`
//!
//! Accepts one multipart file field. The stored name is the client's base
//! name prefixed with a millisecond timestamp, so repeated uploads of the
//! same file never collide.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/upload` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(upload))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub filename: String,
}

/// Store the first file field of a multipart body.
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        let Some(original) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?;

        let filename = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_filename(&original)
        );
        let url = state.content.upload(&filename, &bytes).await?;

        info!(filename = %filename, "file uploaded");
        return Ok(Json(UploadResponse {
            success: true,
            url,
            filename,
        }));
    }

    Err(AppError::BadRequest("no file field in upload".to_owned()))
}

/// Reduce a client-supplied filename to a safe base name: directory
/// components dropped, characters outside `[a-zA-Z0-9._-]` replaced with
/// `-`, dot runs collapsed so no `..` survives.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut cleaned = String::with_capacity(base.len());
    let mut last_dot = false;
    for ch in base.chars() {
        let ch = if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            ch
        } else {
            '-'
        };
        if ch == '.' {
            if last_dot {
                continue;
            }
            last_dot = true;
        } else {
            last_dot = false;
        }
        cleaned.push(ch);
    }

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "file".to_owned()
    } else {
        cleaned.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("img.png"), "img.png");
        assert_eq!(sanitize_filename("a/b/img.png"), "img.png");
        assert_eq!(sanitize_filename("..\\..\\img.png"), "img.png");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my-photo--1-.png");
        assert_eq!(sanitize_filename("naïve.png"), "na-ve.png");
    }

    #[test]
    fn sanitize_collapses_dot_runs() {
        assert_eq!(sanitize_filename("my..file.png"), "my.file.png");
        assert_eq!(sanitize_filename("..."), "file");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("///"), "file");
    }
}
