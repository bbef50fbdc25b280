//! Authentication routes: `/api/auth/*`
//!
//! Login is rate limited per client identifier before credentials are even
//! looked at, and every failure collapses to the same generic `401` body.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use tracing::{error, info, warn};

use inkpad_core::session::SESSION_TTL_SECS;

use crate::error::AppError;
use crate::middleware::{ClientId, SESSION_COOKIE};
use crate::routes::SuccessResponse;
use crate::state::AppState;

/// Build the `/api/auth` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Verify credentials and set the session cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<ClientId>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let decision = state.rate_limiter.check(&client.0).await;
    if decision.limited {
        warn!(client = %client.0, "login rate limit exceeded");
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(),
        });
    }

    let matched = state
        .credentials
        .verify(&body.username, &body.password)
        .map_err(|err| {
            error!(error = %err, "login unavailable");
            AppError::Internal(err.to_string())
        })?;

    if !matched {
        state.rate_limiter.increment(&client.0).await;
        warn!(client = %client.0, "failed login attempt");
        return Err(AppError::InvalidCredentials);
    }

    state.rate_limiter.reset(&client.0).await;
    let token = state.sessions.issue(&body.username)?;

    info!(username = %body.username, "admin logged in");
    Ok((
        [(header::SET_COOKIE, session_cookie(&token, state.production))],
        Json(SuccessResponse { success: true }),
    )
        .into_response())
}

/// Clear the session cookie. Stateless tokens have nothing to revoke
/// server-side, so this always succeeds.
async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::SET_COOKIE, clear_cookie(state.production))],
        Json(SuccessResponse { success: true }),
    )
        .into_response()
}

fn session_cookie(token: &str, production: bool) -> String {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
        .to_string()
}

fn clear_cookie(production: bool) -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_carries_the_hardening_attributes() {
        let value = session_cookie("tok", false);
        assert!(value.starts_with("inkpad_session=tok"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Path=/"));
        assert!(!value.contains("Secure"));

        let value = session_cookie("tok", true);
        assert!(value.contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = clear_cookie(false);
        assert!(value.starts_with("inkpad_session="));
        assert!(value.contains("Max-Age=0"));
    }
}
