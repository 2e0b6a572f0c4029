//! Shared per-account runtime state, plus the group-admin cache and
//! one-warning-per-hour tracking used to avoid spamming groups the bot
//! isn't an admin of (§5).

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use chatgate_channels::{ChannelTransport, message_log::MessageLog, plugin::ChannelEventSink};

use crate::config::BotAccountConfig;

/// Shared account state map, keyed by account id.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state.
pub struct AccountState {
    pub bot: teloxide::Bot,
    pub bot_username: Option<String>,
    pub account_id: String,
    pub config: BotAccountConfig,
    /// The rate-gated transport for this account, shared by every handler
    /// call and by [`chatgate_channels::draft::DraftStream`].
    pub transport: Arc<dyn ChannelTransport>,
    pub cancel: CancellationToken,
    pub message_log: Option<Arc<dyn MessageLog>>,
    pub event_sink: Option<Arc<dyn ChannelEventSink>>,
    pub admin_cache: GroupAdminCache,
    pub warnings: AdminWarningTracker,
}

const ADMIN_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Caches whether the bot is an admin in a given group, so every inbound
/// message doesn't need a fresh `getChatMember` call.
#[derive(Clone, Default)]
pub struct GroupAdminCache {
    entries: Arc<DashMap<String, (bool, Instant)>>,
}

impl GroupAdminCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached admin status if it hasn't expired.
    #[must_use]
    pub fn get(&self, group_id: &str) -> Option<bool> {
        let entry = self.entries.get(group_id)?;
        let (is_admin, fetched_at) = *entry;
        if fetched_at.elapsed() < ADMIN_CACHE_TTL {
            Some(is_admin)
        } else {
            None
        }
    }

    pub fn set(&self, group_id: &str, is_admin: bool) {
        self.entries.insert(group_id.to_string(), (is_admin, Instant::now()));
    }
}

/// Tracks the last "bot is not an admin here" warning sent per chat, so at
/// most one is sent per `cooldown` window (§5 testable property: "the bot
/// sends exactly one admin-required warning, then stays silent for that
/// chat for the remainder of the cooldown").
#[derive(Clone, Default)]
pub struct AdminWarningTracker {
    last_warned: Arc<DashMap<String, Instant>>,
}

impl AdminWarningTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a warning should be sent now, and records that a
    /// warning was sent. Subsequent calls within `cooldown` return `false`.
    #[must_use]
    pub fn should_warn(&self, chat_id: &str, cooldown: Duration) -> bool {
        let now = Instant::now();
        match self.last_warned.get(chat_id) {
            Some(entry) if now.duration_since(*entry) < cooldown => false,
            _ => {
                self.last_warned.insert(chat_id.to_string(), now);
                true
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_cache_roundtrip() {
        let cache = GroupAdminCache::new();
        assert_eq!(cache.get("grp1"), None);
        cache.set("grp1", true);
        assert_eq!(cache.get("grp1"), Some(true));
    }

    #[test]
    fn warning_tracker_fires_once_per_cooldown() {
        let tracker = AdminWarningTracker::new();
        let cooldown = Duration::from_secs(3600);
        assert!(tracker.should_warn("chat1", cooldown));
        assert!(!tracker.should_warn("chat1", cooldown));
        assert!(tracker.should_warn("chat2", cooldown));
    }

    #[test]
    fn warning_tracker_fires_again_after_cooldown() {
        let tracker = AdminWarningTracker::new();
        assert!(tracker.should_warn("chat1", Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(tracker.should_warn("chat1", Duration::from_millis(0)));
    }
}
