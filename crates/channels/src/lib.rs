//! Channel plugin system.
//!
//! Each channel (the bot adapter, webchat, generic webhooks) implements the
//! [`plugin::ChannelPlugin`] trait and the rate-limited [`transport::ChannelTransport`]
//! primitive from §4.1, so the shared [`transport::DraftStream`] and
//! `chatgate-ratelimit`'s `call_transport` never have to be reimplemented
//! per platform (§9 "back-pressure composition").

pub mod draft;
pub mod error;
pub mod gating;
pub mod message_log;
pub mod plugin;
pub mod registry;
pub mod store;
pub mod transport;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelEvent, ChannelEventSink, ChannelHealthSnapshot, ChannelMessageMeta, ChannelPlugin,
        ChannelReplyTarget, ChannelStatus, StreamEvent, StreamReceiver, StreamSender,
    },
    transport::{ChannelTransport, TransportError},
};
