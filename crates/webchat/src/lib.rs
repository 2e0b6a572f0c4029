//! WebSocket-based channel adapter (§4.1, adapter F): text+attachments over
//! the `/chat` upgrade path (§6.3). Unlike the bot adapter, the connecting
//! client is the deployment's own web UI rather than an external platform
//! account, so there is no DM/group gating or pairing gap to enforce here —
//! a connection is trusted the moment the WS upgrade completes. The ingress
//! chain is otherwise identical to the bot adapter's: menu text-input, then
//! the command registry, then the agent collaborator fallback.

pub mod config;
pub mod frame;
pub mod ingress;
pub mod plugin;
pub mod transport;

pub use {config::WebchatAccountConfig, plugin::WebchatPlugin};
