//! Gateway orchestrator: boot, hot-reload, shutdown, and the HTTP/WS
//! surface (§4.4).
//!
//! [`boot::boot`] wires every subsystem leaves-first; [`shutdown`] tears
//! them down in the reverse order, logging (never propagating) a failure
//! in any one step so it can't block the rest (§4.4 "Shutdown").

pub mod boot;
pub mod collaborators;
pub mod config_bridge;
pub mod error;
pub mod event_sink;
pub mod health;
pub mod http;
pub mod reload;
pub mod state;

pub use {
    boot::{Gateway, boot},
    error::{Error, Result},
    state::{GatewayState, SharedState},
};

use tracing::warn;

/// Idempotent shutdown (§4.4 "Shutdown"): HTTP server, then every started
/// channel account, then the hot-reload watcher and reaper tasks. Each
/// step is wrapped in its own `try/log` so one subsystem failing to close
/// cleanly never blocks the rest.
pub async fn shutdown(gateway: Gateway) {
    let Gateway { state, http, reaper, reload } = gateway;

    http.shutdown().await;

    {
        let mut registry = state.channels.write().await;
        let started = state.started_accounts.read().await.clone();
        for (channel_type, account_id) in started {
            let Some(plugin) = registry.get_mut(&channel_type) else { continue };
            if let Err(err) = plugin.stop_account(&account_id).await {
                warn!(channel_type, account_id, error = %err, "failed to stop channel account during shutdown");
            }
        }
    }

    reload.shutdown().await;
    reaper.abort();

    if let Err(err) = state.collaborators.agent.dispose().await {
        warn!(error = %err, "agent collaborator failed to dispose during shutdown");
    }
    if let Err(err) = state.collaborators.copy_trading.shutdown().await {
        warn!(error = %err, "copy-trading orchestrator failed to shut down cleanly");
    }

    state.store.pool().close().await;
}
