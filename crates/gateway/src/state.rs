//! `GatewayState` — the long-lived handles the orchestrator constructs once
//! at boot and that every HTTP/WS route, hot-reload cycle, and adapter
//! shares for the process lifetime (§9 "ownership of long-lived state").
//! Short-lived per-request state (e.g. a single WS connection's send half)
//! is never stored here.

use std::sync::Arc;

use tokio::sync::RwLock;

use chatgate_channels::registry::ChannelRegistry;
use chatgate_commands::CommandRegistry;
use chatgate_config::schema::ChatgateConfig;
use chatgate_menu::MenuService;
use chatgate_pairing::PairingService;
use chatgate_store::Store;

use crate::{collaborators::Collaborators, event_sink::GatewayEventSink};

/// Everything boot constructs once and shutdown tears down once, shared
/// behind `Arc` by every axum handler and background task.
pub struct GatewayState {
    pub store: Store,
    pub pairing: Arc<PairingService>,
    pub menu: Arc<MenuService>,
    pub commands: Arc<CommandRegistry>,
    pub channels: RwLock<ChannelRegistry>,
    /// `(channel_type, account_id)` pairs that `start_account` succeeded
    /// for, maintained by `boot`/`reload` since `ChannelRegistry` itself
    /// has no generic way to enumerate a plugin's started accounts.
    pub started_accounts: RwLock<Vec<(String, String)>>,
    pub event_sink: Arc<GatewayEventSink>,
    pub collaborators: Collaborators,
    #[cfg(feature = "metrics")]
    pub metrics: chatgate_metrics::MetricsHandle,
    /// Current config, swapped in wholesale on a successful hot reload
    /// (§4.4 "Hot reload"). Readers take a cheap clone; writers replace the
    /// whole `Arc` rather than mutating fields in place.
    pub config: RwLock<Arc<ChatgateConfig>>,
}

impl GatewayState {
    #[must_use]
    pub async fn current_config(&self) -> Arc<ChatgateConfig> {
        self.config.read().await.clone()
    }
}

pub type SharedState = Arc<GatewayState>;
