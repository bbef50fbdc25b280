//! Signed session tokens.
//!
//! Sessions are stateless: a token is a base64url JSON payload plus an
//! HMAC-SHA256 tag, and validity is purely a function of the signature and
//! the embedded expiry. There is no server-side session store.
//!
//! # Security model
//!
//! - Token format: `base64url(payload) . base64url(HMAC-SHA256(secret, base64url(payload)))`.
//! - The signing secret must be at least 32 bytes; construction fails
//!   otherwise.
//! - Verification collapses every failure mode (wrong shape, bad encoding,
//!   bad signature, unparseable payload, expired) into "no session".
//! - There is no revocation list. A stolen token stays valid until it
//!   expires — accepted for the single-admin threat model.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime: seven days.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Minimum length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// The authenticated state carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated admin username.
    pub username: String,
    /// Hard expiry. Sessions are never extended past this.
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

/// HMAC key material, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SigningSecret(Vec<u8>);

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct SessionManager {
    secret: SigningSecret,
    ttl: Duration,
}

impl SessionManager {
    /// Create a manager with the default seven-day session lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WeakSecret`] if `secret` is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &[u8]) -> Result<Self, SessionError> {
        Self::with_ttl(secret, Duration::seconds(SESSION_TTL_SECS))
    }

    /// Create a manager with a custom session lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WeakSecret`] if `secret` is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Result<Self, SessionError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::WeakSecret {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        Ok(Self {
            secret: SigningSecret(secret.to_vec()),
            ttl,
        })
    }

    /// Issue a signed token for `username`, expiring after the configured
    /// lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] if the payload cannot be serialized.
    pub fn issue(&self, username: &str) -> Result<String, SessionError> {
        let session = Session {
            username: username.to_owned(),
            expires_at: Utc::now() + self.ttl,
        };
        let payload = serde_json::to_vec(&session).map_err(|e| SessionError::Encode {
            reason: e.to_string(),
        })?;

        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let tag = self.sign(encoded.as_bytes());
        Ok(format!("{encoded}.{tag}"))
    }

    /// Verify a token and return the session it carries.
    ///
    /// Returns `None` on any failure: wrong shape, invalid base64, bad
    /// signature, unparseable payload, or an expiry that has passed.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<Session> {
        let (payload_b64, tag_b64) = token.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;

        let mut mac = hmac_sha256(&self.secret.0);
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&tag).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let session: Session = serde_json::from_slice(&payload).ok()?;
        if session.expires_at <= Utc::now() {
            return None;
        }
        Some(session)
    }

    fn sign(&self, data: &[u8]) -> String {
        let mut mac = hmac_sha256(&self.secret.0);
        mac.update(data);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Build an HMAC-SHA256 instance for `key`.
#[allow(clippy::unwrap_used)]
fn hmac_sha256(key: &[u8]) -> HmacSha256 {
    // HMAC-SHA256 accepts any key length per RFC 2104, so new_from_slice
    // never fails here.
    HmacSha256::new_from_slice(key).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn manager() -> SessionManager {
        SessionManager::new(SECRET).unwrap()
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let token = manager().issue("admin").unwrap();
        let session = manager().verify(&token).expect("token should verify");
        assert_eq!(session.username, "admin");
        assert!(session.expires_at > Utc::now());
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = SessionManager::with_ttl(SECRET, Duration::seconds(-1)).unwrap();
        let token = manager.issue("admin").unwrap();
        assert!(manager.verify(&token).is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = manager().issue("admin").unwrap();
        let (payload, tag) = token.split_once('.').unwrap();
        let mut flipped = payload.to_owned();
        let replacement = if flipped.starts_with('A') { "B" } else { "A" };
        flipped.replace_range(0..1, replacement);
        assert!(manager().verify(&format!("{flipped}.{tag}")).is_none());
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let token = manager().issue("admin").unwrap();
        let (payload, tag) = token.split_once('.').unwrap();
        let mut flipped = tag.to_owned();
        let replacement = if flipped.starts_with('A') { "B" } else { "A" };
        flipped.replace_range(0..1, replacement);
        assert!(manager().verify(&format!("{payload}.{flipped}")).is_none());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = SessionManager::new(b"ffffffffffffffffffffffffffffffff").unwrap();
        let token = other.issue("admin").unwrap();
        assert!(manager().verify(&token).is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let manager = manager();
        assert!(manager.verify("").is_none());
        assert!(manager.verify("no-dot-here").is_none());
        assert!(manager.verify("!!!.???").is_none());
        assert!(manager.verify("a.b.c").is_none());
    }

    #[test]
    fn short_secret_is_refused() {
        let err = SessionManager::new(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::WeakSecret { min: 32, actual: 31 }
        ));
        assert!(SessionManager::new(&[0u8; 32]).is_ok());
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let session = Session {
            username: "admin".to_owned(),
            expires_at: Utc::now(),
        };
        let wire = serde_json::to_value(&session).unwrap();
        assert!(wire.get("expiresAt").is_some());
        assert!(wire.get("username").is_some());
    }
}
