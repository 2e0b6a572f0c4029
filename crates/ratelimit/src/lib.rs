//! Transport-level rate limiting and retry policy shared by every channel
//! adapter (bot, webchat, webhook) and the gateway's own outbound calls.
//!
//! Two concerns live here because they compose directly: a caller always
//! waits at the [`bucket::RateLimiter`] gate before attempting a transport
//! call, and [`retry::call_transport`] is the place that loop lives so
//! adapters don't each reimplement it slightly differently.

pub mod bucket;
pub mod retry;

pub use bucket::{CheckResult, RateLimiter, RateLimiterConfig, spawn_sweeper};
pub use retry::{MAX_RETRIES_AFTER_429, MIN_GATE_WAIT, MIN_RETRY_AFTER, RetrySignal, call_transport, rate_gate};
