//! Inbound access control (§4.1 DM/group policy, §4.2 pairing gap).

use chatgate_channels::gating::{self, DmPolicy, GroupPolicy, MentionMode};
use chatgate_common::types::ChatType;
use chatgate_pairing::TrustLevel;

use crate::config::BotAccountConfig;

/// Determine if an inbound message should be processed.
pub fn check_access(
    config: &BotAccountConfig,
    chat_type: &ChatType,
    peer_id: &str,
    username: Option<&str>,
    group_id: Option<&str>,
    bot_mentioned: bool,
    trust: TrustLevel,
) -> Result<(), AccessDenied> {
    match chat_type {
        ChatType::Dm => check_dm_access(config, peer_id, username, trust),
        ChatType::Group => check_group_access(config, group_id, bot_mentioned),
    }
}

fn check_dm_access(
    config: &BotAccountConfig,
    peer_id: &str,
    username: Option<&str>,
    trust: TrustLevel,
) -> Result<(), AccessDenied> {
    match config.dm_policy {
        DmPolicy::Disabled => Err(AccessDenied::DmsDisabled),
        DmPolicy::Open => Ok(()),
        DmPolicy::Allowlist => {
            // An empty allowlist with an explicit Allowlist policy means
            // "deny everyone", not "allow everyone" — the generic
            // `is_allowed()` treats empty lists as open, so it's
            // short-circuited here.
            if config.allowlist.is_empty() {
                return Err(AccessDenied::NotOnAllowlist);
            }
            if gating::is_allowed(peer_id, &config.allowlist)
                || username.is_some_and(|u| gating::is_allowed(u, &config.allowlist))
            {
                Ok(())
            } else {
                Err(AccessDenied::NotOnAllowlist)
            }
        },
        DmPolicy::Pairing => {
            if trust >= TrustLevel::Paired {
                Ok(())
            } else {
                Err(AccessDenied::NeedsPairing)
            }
        },
    }
}

fn check_group_access(config: &BotAccountConfig, group_id: Option<&str>, bot_mentioned: bool) -> Result<(), AccessDenied> {
    match config.group_policy {
        GroupPolicy::Disabled => return Err(AccessDenied::GroupsDisabled),
        GroupPolicy::Allowlist => {
            let gid = group_id.unwrap_or("");
            if config.group_allowlist.is_empty() || !gating::is_allowed(gid, &config.group_allowlist) {
                return Err(AccessDenied::GroupNotOnAllowlist);
            }
        },
        GroupPolicy::Open => {},
    }

    match config.mention_mode {
        MentionMode::Always => Ok(()),
        MentionMode::None => Err(AccessDenied::MentionModeNone),
        MentionMode::Mention => {
            if bot_mentioned {
                Ok(())
            } else {
                Err(AccessDenied::NotMentioned)
            }
        },
    }
}

/// Reason an inbound message was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    DmsDisabled,
    NotOnAllowlist,
    /// DM policy is `pairing` and the sender is a stranger. The caller
    /// should issue a pairing challenge rather than silently dropping the
    /// message (§4.2).
    NeedsPairing,
    GroupsDisabled,
    GroupNotOnAllowlist,
    MentionModeNone,
    NotMentioned,
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DmsDisabled => write!(f, "DMs are disabled"),
            Self::NotOnAllowlist => write!(f, "user not on allowlist"),
            Self::NeedsPairing => write!(f, "user is not paired"),
            Self::GroupsDisabled => write!(f, "groups are disabled"),
            Self::GroupNotOnAllowlist => write!(f, "group not on allowlist"),
            Self::MentionModeNone => write!(f, "bot does not respond in groups"),
            Self::NotMentioned => write!(f, "bot was not mentioned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BotAccountConfig {
        BotAccountConfig { dm_policy: DmPolicy::Open, ..Default::default() }
    }

    #[test]
    fn open_dm_allows_all() {
        let c = cfg();
        assert!(check_access(&c, &ChatType::Dm, "anyone", None, None, false, TrustLevel::Stranger).is_ok());
    }

    #[test]
    fn disabled_dm_rejects() {
        let mut c = cfg();
        c.dm_policy = DmPolicy::Disabled;
        assert_eq!(
            check_access(&c, &ChatType::Dm, "user", None, None, false, TrustLevel::Stranger),
            Err(AccessDenied::DmsDisabled)
        );
    }

    #[test]
    fn allowlist_dm_by_peer_id() {
        let mut c = cfg();
        c.dm_policy = DmPolicy::Allowlist;
        c.allowlist = vec!["alice".into()];
        assert!(check_access(&c, &ChatType::Dm, "alice", None, None, false, TrustLevel::Stranger).is_ok());
        assert_eq!(
            check_access(&c, &ChatType::Dm, "bob", None, None, false, TrustLevel::Stranger),
            Err(AccessDenied::NotOnAllowlist)
        );
    }

    #[test]
    fn pairing_policy_requires_paired_trust() {
        let mut c = cfg();
        c.dm_policy = DmPolicy::Pairing;
        assert_eq!(
            check_access(&c, &ChatType::Dm, "u1", None, None, false, TrustLevel::Stranger),
            Err(AccessDenied::NeedsPairing)
        );
        assert!(check_access(&c, &ChatType::Dm, "u1", None, None, false, TrustLevel::Paired).is_ok());
        assert!(check_access(&c, &ChatType::Dm, "u1", None, None, false, TrustLevel::Owner).is_ok());
    }

    #[test]
    fn group_mention_required() {
        let c = cfg();
        assert_eq!(
            check_access(&c, &ChatType::Group, "user", None, Some("grp1"), false, TrustLevel::Stranger),
            Err(AccessDenied::NotMentioned)
        );
        assert!(check_access(&c, &ChatType::Group, "user", None, Some("grp1"), true, TrustLevel::Stranger).is_ok());
    }

    #[test]
    fn group_disabled() {
        let mut c = cfg();
        c.group_policy = GroupPolicy::Disabled;
        assert_eq!(
            check_access(&c, &ChatType::Group, "user", None, Some("grp1"), true, TrustLevel::Stranger),
            Err(AccessDenied::GroupsDisabled)
        );
    }

    #[test]
    fn group_allowlist() {
        let mut c = cfg();
        c.group_policy = GroupPolicy::Allowlist;
        c.group_allowlist = vec!["grp1".into()];
        c.mention_mode = MentionMode::Always;
        assert!(check_access(&c, &ChatType::Group, "user", None, Some("grp1"), false, TrustLevel::Stranger).is_ok());
        assert_eq!(
            check_access(&c, &ChatType::Group, "user", None, Some("grp2"), false, TrustLevel::Stranger),
            Err(AccessDenied::GroupNotOnAllowlist)
        );
    }

    /// Security regression: removing the last entry from an allowlist must
    /// not silently switch to open access.
    #[test]
    fn security_removing_last_allowlist_entry_denies_access() {
        let mut c = cfg();
        c.dm_policy = DmPolicy::Allowlist;
        c.allowlist = vec!["377114917".into()];
        assert!(check_access(&c, &ChatType::Dm, "377114917", Some("alice"), None, false, TrustLevel::Stranger).is_ok());

        c.allowlist.clear();
        assert_eq!(
            check_access(&c, &ChatType::Dm, "377114917", None, None, false, TrustLevel::Stranger),
            Err(AccessDenied::NotOnAllowlist),
            "empty DM allowlist must deny by peer_id"
        );
        assert_eq!(
            check_access(&c, &ChatType::Dm, "377114917", Some("alice"), None, false, TrustLevel::Stranger),
            Err(AccessDenied::NotOnAllowlist),
            "empty DM allowlist must deny by username"
        );
    }

    #[test]
    fn empty_group_allowlist_denies_all() {
        let mut c = cfg();
        c.group_policy = GroupPolicy::Allowlist;
        c.mention_mode = MentionMode::Always;
        assert_eq!(
            check_access(&c, &ChatType::Group, "user", None, Some("grp1"), true, TrustLevel::Stranger),
            Err(AccessDenied::GroupNotOnAllowlist)
        );
    }
}
