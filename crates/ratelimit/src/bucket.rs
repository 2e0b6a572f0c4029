//! Fixed-window token-bucket rate limiter (§5 of the gateway spec).
//!
//! Each key (`chat:{chatId}` or `global`) gets a counter that resets every
//! `window`. `check` is O(1) and lock-free per key (`DashMap` shards
//! internally); a periodic `sweep` evicts stale entries so memory doesn't
//! grow unbounded across many short-lived chats.

use {
    dashmap::DashMap,
    serde::{Deserialize, Serialize},
    std::{
        sync::Arc,
        time::{Duration, Instant},
    },
};

#[cfg(feature = "metrics")]
use chatgate_metrics::{counter, gauge, ratelimit as rl_metrics};

/// Static configuration for one rate-limited surface (an adapter, a gateway
/// ingress path, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum allowed requests per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// When true, bucket keys are scoped per chat (`chat:{chatId}`);
    /// otherwise a single `global` bucket is shared by every caller.
    pub per_user: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_ms: 60_000,
            per_user: true,
        }
    }
}

/// Result of a `check` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckResult {
    pub allowed: bool,
    pub reset_in: Duration,
}

#[derive(Debug, Clone, Copy)]
struct BucketState {
    count: u32,
    window_start: Instant,
}

/// A token-bucket rate limiter keyed by an arbitrary string.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: Arc<DashMap<String, BucketState>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Resolve the bucket key for a chat under this limiter's policy.
    #[must_use]
    pub fn key_for(&self, chat_id: &str) -> String {
        if self.config.per_user {
            format!("chat:{chat_id}")
        } else {
            "global".to_string()
        }
    }

    /// Check and, if allowed, consume one token for `key`.
    pub fn check(&self, key: &str) -> CheckResult {
        let window = Duration::from_millis(self.config.window_ms);
        let now = Instant::now();

        #[cfg(feature = "metrics")]
        counter!(rl_metrics::CHECKS_TOTAL).increment(1);

        let mut entry = self.buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        let elapsed = now.duration_since(entry.window_start);
        let reset_in = window.saturating_sub(elapsed);

        if entry.count < self.config.max_requests {
            entry.count += 1;
            CheckResult {
                allowed: true,
                reset_in,
            }
        } else {
            #[cfg(feature = "metrics")]
            counter!(rl_metrics::REJECTIONS_TOTAL).increment(1);
            CheckResult {
                allowed: false,
                reset_in,
            }
        }
    }

    /// Evict buckets whose window started more than `2 * window_ms` ago.
    /// Safe to call from a periodic background task; correctness never
    /// depends on sweep cadence.
    pub fn sweep(&self) {
        let window = Duration::from_millis(self.config.window_ms);
        let stale_after = window * 2;
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, state| now.duration_since(state.window_start) < stale_after);
        let evicted = before.saturating_sub(self.buckets.len());
        #[cfg(feature = "metrics")]
        {
            if evicted > 0 {
                counter!(rl_metrics::SWEEP_EVICTIONS_TOTAL).increment(evicted as u64);
            }
            gauge!(rl_metrics::BUCKETS_ACTIVE).set(self.buckets.len() as f64);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = evicted;
    }

    /// Number of live buckets (for diagnostics/tests).
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Spawn a background task that sweeps `limiter` every `interval`. Returns a
/// handle the caller can abort on shutdown.
pub fn spawn_sweeper(limiter: RateLimiter, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.sweep();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_requests() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 3,
            window_ms: 60_000,
            per_user: true,
        });
        for _ in 0..3 {
            assert!(limiter.check("chat:1").allowed);
        }
        assert!(!limiter.check("chat:1").allowed);
    }

    #[test]
    fn per_user_keys_are_independent() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 1,
            window_ms: 60_000,
            per_user: true,
        });
        assert!(limiter.check(&limiter.key_for("a")).allowed);
        assert!(limiter.check(&limiter.key_for("b")).allowed);
        assert!(!limiter.check(&limiter.key_for("a")).allowed);
    }

    #[test]
    fn global_policy_shares_one_bucket() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 1,
            window_ms: 60_000,
            per_user: false,
        });
        assert_eq!(limiter.key_for("a"), limiter.key_for("b"));
        assert!(limiter.check(&limiter.key_for("a")).allowed);
        assert!(!limiter.check(&limiter.key_for("b")).allowed);
    }

    #[test]
    fn sweep_evicts_entries_older_than_two_windows() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 1,
            window_ms: 1,
            per_user: true,
        });
        limiter.check("chat:1");
        std::thread::sleep(Duration::from_millis(5));
        limiter.sweep();
        assert_eq!(limiter.len(), 0);
    }
}
