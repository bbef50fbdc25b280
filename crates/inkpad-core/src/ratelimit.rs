//! Login rate limiting.
//!
//! A fixed-window counter per client identifier: five attempts per fifteen
//! minutes, after which logins are refused until the window ends. Entries
//! self-heal — `check` and `increment` restart any window whose reset time
//! has passed — so the periodic sweep only bounds memory, it is not needed
//! for correctness.
//!
//! Concurrent attempts for the same identifier may interleave between a
//! `check` and its `increment`; the count is an approximation, not a strict
//! serial counter.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// Attempts allowed per window.
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Window length in seconds (15 minutes).
pub const LOGIN_WINDOW_SECS: i64 = 15 * 60;

/// How often the background sweep should run, in seconds (5 minutes).
pub const SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the identifier has exhausted its attempts for this window.
    pub limited: bool,
    /// Attempts left before the identifier becomes limited.
    pub remaining: u32,
    /// When the current window ends and the count starts over.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window resets, for a `Retry-After` header.
    /// Never less than 1.
    #[must_use]
    pub fn retry_after_secs(&self) -> i64 {
        (self.reset_at - Utc::now()).num_seconds().max(1)
    }
}

/// Attempt bookkeeping keyed by client identifier.
///
/// Injected rather than global so handlers can be tested with a fresh store
/// and multi-instance deployments can plug in a shared backend.
#[async_trait]
pub trait RateLimitStore: Send + Sync + 'static {
    /// Report the current state for `key`, starting a fresh window if none
    /// is active.
    async fn check(&self, key: &str) -> RateLimitDecision;

    /// Record one attempt for `key`.
    async fn increment(&self, key: &str);

    /// Forget `key` entirely. Called after a successful login.
    async fn reset(&self, key: &str);

    /// Drop entries whose window has ended. Best-effort: `check` and
    /// `increment` recover expired entries on their own.
    async fn sweep(&self);
}

struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// In-process [`RateLimitStore`] for single-instance deployments.
pub struct MemoryRateLimitStore {
    max_attempts: u32,
    window: Duration,
    entries: RwLock<HashMap<String, WindowEntry>>,
}

impl MemoryRateLimitStore {
    /// Create a store allowing `max_attempts` per `window`.
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of identifiers currently tracked, including expired entries
    /// the sweep has not collected yet.
    pub async fn tracked(&self) -> usize {
        self.entries.read().await.len()
    }

    fn refresh(&self, entry: &mut WindowEntry, now: DateTime<Utc>) {
        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }
    }
}

impl Default for MemoryRateLimitStore {
    /// Five attempts per fifteen-minute window.
    fn default() -> Self {
        Self::new(MAX_LOGIN_ATTEMPTS, Duration::seconds(LOGIN_WINDOW_SECS))
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn check(&self, key: &str) -> RateLimitDecision {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_owned()).or_insert_with(|| WindowEntry {
            count: 0,
            reset_at: now + self.window,
        });
        self.refresh(entry, now);

        RateLimitDecision {
            limited: entry.count >= self.max_attempts,
            remaining: self.max_attempts.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        }
    }

    async fn increment(&self, key: &str) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_owned()).or_insert_with(|| WindowEntry {
            count: 0,
            reset_at: now + self.window,
        });
        self.refresh(entry, now);
        entry.count = entry.count.saturating_add(1);
    }

    async fn reset(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn sweep(&self) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.reset_at);
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, tracked = entries.len(), "swept expired rate-limit entries");
        }
    }
}

impl std::fmt::Debug for MemoryRateLimitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRateLimitStore")
            .field("max_attempts", &self.max_attempts)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_key_has_full_quota() {
        let store = MemoryRateLimitStore::default();
        let decision = store.check("1.2.3.4").await;
        assert!(!decision.limited);
        assert_eq!(decision.remaining, MAX_LOGIN_ATTEMPTS);
    }

    #[tokio::test]
    async fn five_increments_exhaust_quota() {
        let store = MemoryRateLimitStore::default();
        for _ in 0..5 {
            store.increment("1.2.3.4").await;
        }
        let decision = store.check("1.2.3.4").await;
        assert!(decision.limited);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn sixth_increment_saturates_at_zero_remaining() {
        let store = MemoryRateLimitStore::default();
        for _ in 0..6 {
            store.increment("1.2.3.4").await;
        }
        let decision = store.check("1.2.3.4").await;
        assert!(decision.limited);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn reset_restores_full_quota() {
        let store = MemoryRateLimitStore::default();
        for _ in 0..5 {
            store.increment("1.2.3.4").await;
        }
        store.reset("1.2.3.4").await;
        let decision = store.check("1.2.3.4").await;
        assert!(!decision.limited);
        assert_eq!(decision.remaining, MAX_LOGIN_ATTEMPTS);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = MemoryRateLimitStore::default();
        for _ in 0..5 {
            store.increment("1.2.3.4").await;
        }
        let other = store.check("5.6.7.8").await;
        assert!(!other.limited);
        assert_eq!(other.remaining, MAX_LOGIN_ATTEMPTS);
    }

    #[tokio::test]
    async fn expired_window_self_heals() {
        let store = MemoryRateLimitStore::new(2, Duration::milliseconds(50));
        store.increment("1.2.3.4").await;
        store.increment("1.2.3.4").await;
        assert!(store.check("1.2.3.4").await.limited);

        tokio::time::sleep(std::time::Duration::from_millis(120)).await;

        let decision = store.check("1.2.3.4").await;
        assert!(!decision.limited);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test]
    async fn check_pins_the_window() {
        let store = MemoryRateLimitStore::default();
        let first = store.check("1.2.3.4").await;
        let second = store.check("1.2.3.4").await;
        assert_eq!(first.reset_at, second.reset_at);
    }

    #[tokio::test]
    async fn retry_after_is_positive_and_bounded() {
        let store = MemoryRateLimitStore::default();
        let decision = store.check("1.2.3.4").await;
        let secs = decision.retry_after_secs();
        assert!(secs >= 1);
        assert!(secs <= LOGIN_WINDOW_SECS);
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_entries() {
        let store = MemoryRateLimitStore::new(5, Duration::milliseconds(50));
        store.increment("old").await;
        tokio::time::sleep(std::time::Duration::from_millis(120)).await;
        store.increment("new").await;

        assert_eq!(store.tracked().await, 2);
        store.sweep().await;
        assert_eq!(store.tracked().await, 1);
    }
}
