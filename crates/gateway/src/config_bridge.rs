//! Translates the `chatgate-config` schema (§10.3) into the per-account
//! JSON blobs each [`chatgate_channels::ChannelPlugin`] expects via
//! `start_account`. Each adapter owns its own account-config struct
//! (`BotAccountConfig`, `WebchatAccountConfig`, `WebhookAccountConfig`);
//! this module is the only place that knows how the gateway-level schema
//! maps onto them.

use chatgate_config::schema::ChatgateConfig;

/// Every `(channel_type, account_id, config)` triple the orchestrator
/// should start at boot (§4.4 step 5), derived from `config.channels`.
pub struct AccountSpec {
    pub channel_type: &'static str,
    pub account_id: String,
    pub config: serde_json::Value,
}

#[must_use]
pub fn account_specs(config: &ChatgateConfig) -> Vec<AccountSpec> {
    let mut specs = Vec::new();

    for (account_id, telegram) in &config.channels.telegram {
        let bot_config = serde_json::json!({
            "token": telegram.bot_token,
            "dm_policy": dm_policy_str(&telegram.dm_policy),
            "group_policy": "open",
            "mention_mode": if telegram.group_requires_mention { "mention" } else { "always" },
            "allowlist": telegram.allowlist,
            "group_allowlist": Vec::<String>::new(),
            "stream_mode": "edit_in_place",
            "edit_throttle_ms": 500,
            "admin_warning_cooldown_secs": 3600,
            "auto_approve_local": config.pairing.auto_approve_local,
            "auto_approve_tailscale": config.pairing.auto_approve_tailscale,
            "promote_first_pairing_to_owner": config.pairing.promote_to_owner,
        });
        specs.push(AccountSpec { channel_type: "bot", account_id: account_id.clone(), config: bot_config });
    }

    if let Some(webchat) = &config.channels.webchat {
        let webchat_config = serde_json::json!({
            "path": webchat.path,
            "edit_throttle_ms": 500,
        });
        specs.push(AccountSpec { channel_type: "webchat", account_id: "default".to_string(), config: webchat_config });
    }

    for (integration, webhook) in &config.channels.webhook {
        let webhook_config = serde_json::json!({
            "shared_secret": webhook.shared_secret,
            "response_timeout_secs": 30,
        });
        specs.push(AccountSpec { channel_type: "webhook", account_id: integration.clone(), config: webhook_config });
    }

    specs
}

fn dm_policy_str(policy: &chatgate_config::schema::DmPolicy) -> &'static str {
    use chatgate_config::schema::DmPolicy;
    match policy {
        DmPolicy::Open => "open",
        DmPolicy::Allowlist => "allowlist",
        DmPolicy::Pairing => "pairing",
        DmPolicy::Disabled => "disabled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telegram_accounts_carry_their_own_allowlist() {
        let mut config = ChatgateConfig::default();
        config.channels.telegram.insert(
            "main".to_string(),
            chatgate_config::schema::TelegramChannelConfig {
                bot_token: "123:ABC".to_string(),
                allowlist: vec!["alice".to_string()],
                ..Default::default()
            },
        );

        let specs = account_specs(&config);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].channel_type, "bot");
        assert_eq!(specs[0].config["token"], "123:ABC");
        assert_eq!(specs[0].config["allowlist"][0], "alice");
    }

    #[test]
    fn webchat_defaults_to_a_single_account() {
        let mut config = ChatgateConfig::default();
        config.channels.webchat = Some(chatgate_config::schema::WebchatChannelConfig::default());
        let specs = account_specs(&config);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].channel_type, "webchat");
    }

    #[test]
    fn no_configured_channels_yields_no_accounts() {
        let config = ChatgateConfig::default();
        assert!(account_specs(&config).is_empty());
    }
}
