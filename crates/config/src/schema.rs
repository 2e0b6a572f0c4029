//! Configuration schema for the gateway (§10.3 of the expanded spec).
//!
//! `ChatgateConfig` is the root. Every adapter, the pairing service, the
//! rate limiter, and the hot-reload watcher read their settings from here;
//! nothing in this crate talks to sqlite or the filesystem beyond loading
//! and saving this tree (see `loader.rs`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatgateConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub ratelimit: RateLimitConfig,
    pub pairing: PairingConfig,
    pub channels: ChannelsConfig,
    pub hot_reload: HotReloadConfig,
    pub tls: TlsConfig,
    pub auth: AuthConfig,
}

/// HTTP/WS server bind settings (§6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to ("0.0.0.0" for all interfaces).
    pub bind: String,
    pub port: u16,
    /// Log every HTTP request/response at debug level.
    pub http_request_logs: bool,
    /// Behind a reverse proxy: disables loopback-from-TCP-source trust in
    /// the pairing service's local auto-approval (§4.2).
    pub behind_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8088,
            http_request_logs: false,
            behind_proxy: false,
        }
    }
}

/// Persistent store settings (§6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Sqlite file path, or `:memory:` for an ephemeral store (tests).
    pub path: String,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "chatgate.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

/// Default transport rate-limit policy (§5), reused per adapter unless a
/// channel overrides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
    pub per_user: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_ms: 60_000,
            per_user: true,
        }
    }
}

/// Pairing-service knobs (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    pub max_pending_per_channel: i64,
    pub code_ttl_secs: u64,
    pub auto_approve_local: bool,
    pub auto_approve_tailscale: bool,
    /// Promote auto-approved users straight to owner trust.
    pub promote_to_owner: bool,
    /// Reaper sweep interval; the spec requires "≤60s" (§4.2 Reaping).
    pub reaper_interval_secs: u64,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            max_pending_per_channel: 3,
            code_ttl_secs: 3_600,
            auto_approve_local: false,
            auto_approve_tailscale: false,
            promote_to_owner: false,
            reaper_interval_secs: 60,
        }
    }
}

/// DM acceptance policy for bot-like channels (§4.1 "DM policy").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmPolicy {
    Open,
    Allowlist,
    #[default]
    Pairing,
    Disabled,
}

/// Per-platform channel configuration (§10.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Telegram-style bot accounts, keyed by account id.
    pub telegram: HashMap<String, TelegramChannelConfig>,
    pub webchat: Option<WebchatChannelConfig>,
    /// Generic automation webhook integrations, keyed by a caller-chosen
    /// integration name (used as the `:platform` path segment).
    pub webhook: HashMap<String, WebhookChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramChannelConfig {
    pub bot_token: String,
    pub dm_policy: DmPolicy,
    pub group_requires_mention: bool,
    /// Static allowlist of user ids, consulted alongside `paired()` under
    /// `DmPolicy::Allowlist` and `DmPolicy::Pairing`.
    pub allowlist: Vec<String>,
    /// Override the default rate-limit policy for this account.
    pub ratelimit: Option<RateLimitConfig>,
}

impl Default for TelegramChannelConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            dm_policy: DmPolicy::default(),
            group_requires_mention: true,
            allowlist: Vec::new(),
            ratelimit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebchatChannelConfig {
    /// WS upgrade path (§6.3: `/chat`).
    pub path: String,
    pub ratelimit: Option<RateLimitConfig>,
}

impl Default for WebchatChannelConfig {
    fn default() -> Self {
        Self {
            path: "/chat".to_string(),
            ratelimit: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookChannelConfig {
    /// Shared secret the caller must present (header name is adapter-defined).
    pub shared_secret: Option<String>,
    pub ratelimit: Option<RateLimitConfig>,
}

/// Hot-reload watcher debounce settings (§4.4 "Hot reload").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    pub config_debounce_ms: u64,
    pub skills_debounce_ms: u64,
    /// Extra paths to watch for skill-reload purposes, beyond the config
    /// file itself.
    pub skill_paths: Vec<String>,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            config_debounce_ms: 250,
            skills_debounce_ms: 150,
            skill_paths: Vec::new(),
        }
    }
}

/// TLS configuration for the gateway's HTTPS listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub auto_generate: bool,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub ca_cert_path: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_generate: false,
            cert_path: None,
            key_path: None,
            ca_cert_path: None,
        }
    }
}

/// Authentication configuration for the admin HTTP surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token required on `GET /metrics` (§6.3). `None` disables the
    /// check, which is only sensible when `server.bind` is loopback.
    pub metrics_token: Option<String>,
}
