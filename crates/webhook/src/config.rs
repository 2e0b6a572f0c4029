//! Per-integration configuration for the generic automation webhook adapter.

use serde::{Deserialize, Serialize};

/// The header a caller must present `shared_secret` in, when one is
/// configured (§6.3 `POST /webhook[/*]`).
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Configuration for a single webhook integration (§10.3 `WebhookChannelConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookAccountConfig {
    pub shared_secret: Option<String>,
    /// How long an inbound call waits for the agent's reply before the
    /// HTTP response times out.
    pub response_timeout_secs: u64,
}

impl Default for WebhookAccountConfig {
    fn default() -> Self {
        Self { shared_secret: None, response_timeout_secs: 30 }
    }
}
