//! Admin credential verification.
//!
//! A single administrator is configured at deployment time. Verification is
//! built so that response timing reveals nothing about the configured
//! credentials.
//!
//! # Security model
//!
//! - Both username and password are compared on every call, even when the
//!   first comparison has already failed.
//! - Comparisons use `subtle::ConstantTimeEq`.
//! - On a length mismatch, the candidate is still compared against a
//!   zero-filled buffer of its own length, so timing does not reveal the
//!   configured value's length.
//! - Malformed input is reported as a failed match, not an error, so the
//!   response does not show which field was rejected.
//! - Stored credentials are zeroized on drop and redacted from `Debug`.

use std::fmt;

use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AuthError;
use crate::validate::{validate_password, validate_username, PasswordPolicy};

/// The configured admin username and password, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    /// Build credentials. Returns `None` when either value is empty, which
    /// callers should treat as "not configured".
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Verifies submitted credentials against the configured admin account.
#[derive(Debug, Clone)]
pub struct CredentialChecker {
    credentials: Option<AdminCredentials>,
    policy: PasswordPolicy,
}

impl CredentialChecker {
    /// Create a checker. `credentials` being `None` makes every call fail
    /// with [`AuthError::Misconfigured`].
    #[must_use]
    pub fn new(credentials: Option<AdminCredentials>, policy: PasswordPolicy) -> Self {
        Self {
            credentials,
            policy,
        }
    }

    /// Check a login attempt.
    ///
    /// Returns `Ok(false)` both for a wrong match and for input that fails
    /// validation. The two are indistinguishable to the caller on purpose.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Misconfigured`] when no admin credentials are
    /// configured, regardless of input.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let expected = self.credentials.as_ref().ok_or(AuthError::Misconfigured)?;

        if validate_username(username).is_err()
            || validate_password(password, self.policy).is_err()
        {
            return Ok(false);
        }

        let username_ok = ct_matches(username.as_bytes(), expected.username.as_bytes());
        let password_ok = ct_matches(password.as_bytes(), expected.password.as_bytes());
        Ok(username_ok & password_ok)
    }
}

/// Constant-time equality over byte strings.
///
/// When lengths differ, the candidate is compared against a zero-filled
/// buffer of its own length and the result is forced to false, keeping the
/// cost proportional to the candidate alone.
fn ct_matches(candidate: &[u8], expected: &[u8]) -> bool {
    if candidate.len() == expected.len() {
        bool::from(candidate.ct_eq(expected))
    } else {
        let dummy = vec![0u8; candidate.len()];
        bool::from(candidate.ct_eq(&dummy) & Choice::from(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> CredentialChecker {
        CredentialChecker::new(
            AdminCredentials::new("admin", "correct-horse"),
            PasswordPolicy::default(),
        )
    }

    #[test]
    fn correct_credentials_pass() {
        assert_eq!(checker().verify("admin", "correct-horse"), Ok(true));
    }

    #[test]
    fn wrong_password_fails() {
        assert_eq!(checker().verify("admin", "wrong-horse"), Ok(false));
    }

    #[test]
    fn wrong_username_fails() {
        assert_eq!(checker().verify("root", "correct-horse"), Ok(false));
    }

    #[test]
    fn wrong_length_password_fails() {
        assert_eq!(checker().verify("admin", "short"), Ok(false));
        assert_eq!(
            checker().verify("admin", "much-longer-than-the-real-one"),
            Ok(false)
        );
    }

    #[test]
    fn empty_input_fails_without_error() {
        assert_eq!(checker().verify("", ""), Ok(false));
        assert_eq!(checker().verify("admin", ""), Ok(false));
        assert_eq!(checker().verify("", "correct-horse"), Ok(false));
    }

    #[test]
    fn invalid_username_characters_fail() {
        assert_eq!(checker().verify("admin!", "correct-horse"), Ok(false));
        assert_eq!(checker().verify("ad min", "correct-horse"), Ok(false));
    }

    #[test]
    fn username_over_limit_fails_even_when_it_would_match() {
        let long = "a".repeat(101);
        let checker = CredentialChecker::new(
            AdminCredentials::new(long.clone(), "pw"),
            PasswordPolicy::default(),
        );
        assert_eq!(checker.verify(&long, "pw"), Ok(false));
    }

    #[test]
    fn username_at_limit_passes() {
        let exact = "a".repeat(100);
        let checker = CredentialChecker::new(
            AdminCredentials::new(exact.clone(), "pw"),
            PasswordPolicy::default(),
        );
        assert_eq!(checker.verify(&exact, "pw"), Ok(true));
    }

    #[test]
    fn missing_configuration_errors_for_any_input() {
        let checker = CredentialChecker::new(None, PasswordPolicy::default());
        assert_eq!(
            checker.verify("admin", "correct-horse"),
            Err(AuthError::Misconfigured)
        );
        assert_eq!(checker.verify("", "!!!"), Err(AuthError::Misconfigured));
    }

    #[test]
    fn empty_configured_values_count_as_missing() {
        assert!(AdminCredentials::new("", "pw").is_none());
        assert!(AdminCredentials::new("admin", "").is_none());
    }

    #[test]
    fn password_policy_applies_to_candidates() {
        let checker = CredentialChecker::new(
            AdminCredentials::new("admin", "short"),
            PasswordPolicy { min_len: 8 },
        );
        // The configured password itself is under the policy minimum, so a
        // matching candidate is still refused.
        assert_eq!(checker.verify("admin", "short"), Ok(false));
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let rendered = format!("{:?}", checker());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("correct-horse"));
        assert!(!rendered.contains("admin"));
    }

    #[test]
    fn ct_matches_handles_length_mismatch() {
        assert!(ct_matches(b"abc", b"abc"));
        assert!(!ct_matches(b"abc", b"abd"));
        assert!(!ct_matches(b"abc", b"abcd"));
        assert!(!ct_matches(b"", b"abc"));
    }
}
