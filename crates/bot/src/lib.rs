//! Telegram-style bot channel adapter (§4.1, adapter E).

pub mod access;
pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod plugin;
pub mod state;
pub mod transport;

pub use {
    config::{BotAccountConfig, StreamMode},
    error::{Error, Result},
    plugin::BotPlugin,
};
