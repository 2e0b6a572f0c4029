//! Transport retry policy for channel adapters (§4.1 `callTransport`).
//!
//! An adapter's outbound call is wrapped so that a 429 response is retried a
//! bounded number of times, honoring any server-advised `Retry-After`, while
//! every attempt (including the first) first waits its turn at the rate
//! gate. This keeps a single slow/limited chat from starving the adapter's
//! other traffic and keeps retries from silently looping forever.

use {
    crate::bucket::RateLimiter,
    std::{future::Future, time::Duration},
};

/// Maximum number of retries performed *after* an initial 429. A 429 on the
/// third retry is propagated to the caller rather than retried again.
pub const MAX_RETRIES_AFTER_429: u32 = 3;

/// Minimum sleep applied to a 429 even if the server didn't advise a
/// `Retry-After`, or advised less than this.
pub const MIN_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Minimum sleep a caller performs after being refused by the rate gate
/// (distinct from `MIN_RETRY_AFTER`, which follows a transport-level 429).
pub const MIN_GATE_WAIT: Duration = Duration::from_millis(250);

/// Implemented by adapter-specific transport errors so [`call_transport`] can
/// recognize rate-limiting without depending on any one transport's error type.
pub trait RetrySignal {
    /// `Some(retry_after)` when this error is a 429/backpressure response the
    /// server wants the caller to retry; `None` for anything else. A
    /// `retry_after` of `None` means the server didn't advise a duration, so
    /// [`MIN_RETRY_AFTER`] is used.
    fn retry_after(&self) -> Option<Option<Duration>>;
}

/// Wait at the rate gate for `key` until admitted, sleeping `reset_in`
/// (floored at [`MIN_GATE_WAIT`]) between attempts.
pub async fn rate_gate(limiter: &RateLimiter, chat_id: &str, _reason: &str) {
    let key = limiter.key_for(chat_id);
    loop {
        let result = limiter.check(&key);
        if result.allowed {
            return;
        }
        tokio::time::sleep(result.reset_in.max(MIN_GATE_WAIT)).await;
    }
}

/// Call `f` through the rate gate, retrying on 429 per §4.1/§5: each attempt
/// waits at the gate first; a 429 sleeps `max(MIN_RETRY_AFTER, retry_after)`
/// and retries, bounded at [`MAX_RETRIES_AFTER_429`] retries; any other
/// error, or a 429 once retries are exhausted, is returned to the caller.
pub async fn call_transport<T, E, F, Fut>(
    limiter: &RateLimiter,
    chat_id: &str,
    reason: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetrySignal,
{
    let mut retries = 0;
    loop {
        rate_gate(limiter, chat_id, reason).await;
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(retry_after) = err.retry_after() else {
                    return Err(err);
                };
                if retries >= MAX_RETRIES_AFTER_429 {
                    return Err(err);
                }
                let wait = retry_after.unwrap_or(MIN_RETRY_AFTER).max(MIN_RETRY_AFTER);
                tokio::time::sleep(wait).await;
                retries += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::bucket::{RateLimiter, RateLimiterConfig},
        std::sync::atomic::{AtomicU32, Ordering},
    };

    #[derive(Debug)]
    enum MockError {
        RateLimited(Option<Duration>),
        Fatal,
    }

    impl RetrySignal for MockError {
        fn retry_after(&self) -> Option<Option<Duration>> {
            match self {
                MockError::RateLimited(d) => Some(*d),
                MockError::Fatal => None,
            }
        }
    }

    fn unlimited() -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_requests: u32::MAX,
            window_ms: 60_000,
            per_user: true,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_429_and_succeeds() {
        let limiter = unlimited();
        let attempts = AtomicU32::new(0);

        let result = call_transport(&limiter, "chat-1", "send_text", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(MockError::RateLimited(Some(Duration::from_secs(2))))
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_propagate_immediately() {
        let limiter = unlimited();
        let attempts = AtomicU32::new(0);

        let result: Result<(), MockError> = call_transport(&limiter, "chat-1", "send_text", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(MockError::Fatal) }
        })
        .await;

        assert!(matches!(result, Err(MockError::Fatal)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retries_then_propagates() {
        let limiter = unlimited();
        let attempts = AtomicU32::new(0);

        let result: Result<(), MockError> = call_transport(&limiter, "chat-1", "send_text", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(MockError::RateLimited(Some(Duration::from_millis(1)))) }
        })
        .await;

        assert!(matches!(result, Err(MockError::RateLimited(_))));
        // initial attempt + MAX_RETRIES_AFTER_429 retries
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_RETRIES_AFTER_429 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_retry_after_falls_back_to_minimum() {
        let limiter = unlimited();
        let attempts = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = call_transport(&limiter, "chat-1", "send_text", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(MockError::RateLimited(None))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert!(start.elapsed() >= MIN_RETRY_AFTER);
    }
}
