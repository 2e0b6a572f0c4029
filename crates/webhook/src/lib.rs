//! Generic HTTP automation webhook adapter (§4.1, adapter G): each
//! configured integration accepts `POST /webhook/:integration` calls and
//! answers synchronously with the agent's (or a slash command's) reply,
//! via a one-shot reply slot per in-flight call rather than the
//! persistent-connection model the bot/webchat adapters use.

pub mod config;
pub mod ingress;
pub mod plugin;
pub mod transport;

pub use {
    config::WebhookAccountConfig,
    plugin::{WebhookError, WebhookPlugin},
};
