//! Configuration loading, validation, env substitution, and templating.
//!
//! Config files: `chatgate.toml`, `chatgate.yaml`, or `chatgate.json`
//! Searched in `./` then `~/.config/chatgate/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{
        config_dir, data_dir, discover_and_load, find_or_default_config_path, load_config,
        save_config, set_config_dir, set_data_dir, update_config,
    },
    schema::{
        AuthConfig, ChannelsConfig, ChatgateConfig, DmPolicy, HotReloadConfig, PairingConfig,
        RateLimitConfig, ServerConfig, StoreConfig, TelegramChannelConfig, TlsConfig,
        WebchatChannelConfig, WebhookChannelConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
