//! Request middleware: session authentication and client identification.
//!
//! Content routes are guarded by [`require_session`], which verifies the
//! session cookie and injects the decoded [`Session`] into request
//! extensions. Absent and invalid cookies are treated identically and
//! short-circuit to `401` before any content operation runs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use cookie::Cookie;

use inkpad_core::session::{Session, SessionManager};

use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "inkpad_session";

/// Rate-limit identity of the calling client.
///
/// The first `X-Forwarded-For` entry when present, else the socket peer
/// address, else `unknown`.
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

/// Axum middleware guarding authenticated routes.
///
/// Injects the verified [`Session`] into request extensions on success.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] when the session cookie is missing,
/// unparseable, tampered with, or expired.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(session) = session_from_headers(req.headers(), &state.sessions) else {
        return Err(AppError::Unauthorized);
    };
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Axum middleware resolving the caller's [`ClientId`] for rate limiting.
pub async fn resolve_client(mut req: Request, next: Next) -> Response {
    let forwarded = forwarded_ip(req.headers());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let id = forwarded
        .or(peer)
        .unwrap_or_else(|| "unknown".to_owned());

    req.extensions_mut().insert(ClientId(id));
    next.run(req).await
}

/// Extract and verify the session cookie from request headers.
#[must_use]
pub fn session_from_headers(headers: &HeaderMap, sessions: &SessionManager) -> Option<Session> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookies.split(';') {
        if let Ok(cookie) = Cookie::parse(part.trim()) {
            if cookie.name() == SESSION_COOKIE {
                return sessions.verify(cookie.value());
            }
        }
    }
    None
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn session_is_read_from_the_cookie_header() {
        let sessions = SessionManager::new(SECRET).unwrap();
        let token = sessions.issue("admin").unwrap();

        let headers = headers_with_cookie(&format!("other=1; {SESSION_COOKIE}={token}"));
        let session = session_from_headers(&headers, &sessions).unwrap();
        assert_eq!(session.username, "admin");
    }

    #[test]
    fn missing_and_garbage_cookies_are_rejected() {
        let sessions = SessionManager::new(SECRET).unwrap();

        assert!(session_from_headers(&HeaderMap::new(), &sessions).is_none());

        let headers = headers_with_cookie("other=1");
        assert!(session_from_headers(&headers, &sessions).is_none());

        let headers = headers_with_cookie(&format!("{SESSION_COOKIE}=not-a-token"));
        assert!(session_from_headers(&headers, &sessions).is_none());
    }

    #[test]
    fn forwarded_ip_takes_the_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(forwarded_ip(&headers), Some("203.0.113.9".to_owned()));

        assert_eq!(forwarded_ip(&HeaderMap::new()), None);
    }
}
