//! Per-account configuration for the bot adapter.

use chatgate_channels::gating::{DmPolicy, GroupPolicy, MentionMode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// How streaming responses are delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Edit a placeholder message in place as tokens arrive (§4.1 draft
    /// streaming).
    #[default]
    EditInPlace,
    /// No streaming — send the final response as a single message.
    Off,
}

/// Configuration for a single bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotAccountConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub token: SecretString,

    pub dm_policy: DmPolicy,
    pub group_policy: GroupPolicy,
    pub mention_mode: MentionMode,

    pub allowlist: Vec<String>,
    pub group_allowlist: Vec<String>,

    pub stream_mode: StreamMode,
    /// Minimum interval between edit-in-place updates, mirrors
    /// [`chatgate_channels::draft::MIN_UPDATE_INTERVAL`] unless overridden.
    pub edit_throttle_ms: u64,

    /// §5 "one warning per hour" for groups where the bot isn't admin.
    pub admin_warning_cooldown_secs: u64,

    /// Whether a pairing request auto-approves for local/tailscale peers
    /// (§4.2 `checkAutoApprove`); only meaningful when `dm_policy` is
    /// `pairing`.
    pub auto_approve_local: bool,
    pub auto_approve_tailscale: bool,
    pub promote_first_pairing_to_owner: bool,
}

impl std::fmt::Debug for BotAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotAccountConfig")
            .field("token", &"[REDACTED]")
            .field("dm_policy", &self.dm_policy)
            .field("group_policy", &self.group_policy)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for BotAccountConfig {
    fn default() -> Self {
        Self {
            token: SecretString::from(String::new()),
            dm_policy: DmPolicy::default(),
            group_policy: GroupPolicy::default(),
            mention_mode: MentionMode::default(),
            allowlist: Vec::new(),
            group_allowlist: Vec::new(),
            stream_mode: StreamMode::default(),
            edit_throttle_ms: 500,
            admin_warning_cooldown_secs: 3600,
            auto_approve_local: false,
            auto_approve_tailscale: false,
            promote_first_pairing_to_owner: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = BotAccountConfig::default();
        assert_eq!(cfg.dm_policy, DmPolicy::Allowlist);
        assert_eq!(cfg.group_policy, GroupPolicy::Open);
        assert_eq!(cfg.admin_warning_cooldown_secs, 3600);
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{
            "token": "123:ABC",
            "dm_policy": "pairing",
            "stream_mode": "off"
        }"#;
        let cfg: BotAccountConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.dm_policy, DmPolicy::Pairing);
        assert_eq!(cfg.stream_mode, StreamMode::Off);
    }
}
