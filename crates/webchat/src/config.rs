//! Per-account configuration for the webchat adapter.

use serde::{Deserialize, Serialize};

/// Configuration for a single webchat account (§10.3 `WebchatChannelConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebchatAccountConfig {
    /// HTTP path this account's WS upgrade is mounted at. Informational at
    /// this layer — the gateway's router owns the actual mount point.
    pub path: String,
    pub edit_throttle_ms: u64,
}

impl Default for WebchatAccountConfig {
    fn default() -> Self {
        Self {
            path: "/chat".to_string(),
            edit_throttle_ms: 500,
        }
    }
}
