//! Backing logic for `GET /health[?deep=true]` (§6.3). Shallow mode only
//! confirms the process is up and the store pool accepts a query; deep
//! mode additionally probes every started channel account.

use serde::Serialize;

use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ChannelHealth {
    pub channel_type: String,
    pub account_id: String,
    pub connected: bool,
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: Status,
    pub store_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<ChannelHealth>>,
}

/// `deep=false`: a failed store ping is the only way to report unhealthy.
/// `deep=true`: additionally probes every started account on every plugin
/// that exposes a [`chatgate_channels::ChannelStatus`]; any disconnected
/// account degrades the overall status rather than failing it outright,
/// since other channels may still be serving traffic fine.
pub async fn check(state: &SharedState, deep: bool) -> HealthReport {
    let store_ok = sqlx::query("SELECT 1").execute(state.store.pool()).await.is_ok();

    if !deep {
        return HealthReport {
            status: if store_ok { Status::Healthy } else { Status::Unhealthy },
            store_ok,
            channels: None,
        };
    }

    if !store_ok {
        return HealthReport { status: Status::Unhealthy, store_ok, channels: Some(Vec::new()) };
    }

    let registry = state.channels.read().await;
    let started = state.started_accounts.read().await;
    let mut channels = Vec::new();
    let mut any_disconnected = false;

    for (channel_type, account_id) in started.iter() {
        let Some(plugin) = registry.get(channel_type) else { continue };
        let Some(status) = plugin.status() else { continue };
        match status.probe(account_id).await {
            Ok(snapshot) => {
                any_disconnected |= !snapshot.connected;
                channels.push(ChannelHealth {
                    channel_type: channel_type.clone(),
                    account_id: account_id.clone(),
                    connected: snapshot.connected,
                    details: snapshot.details,
                });
            },
            Err(err) => {
                any_disconnected = true;
                channels.push(ChannelHealth {
                    channel_type: channel_type.clone(),
                    account_id: account_id.clone(),
                    connected: false,
                    details: Some(err.to_string()),
                });
            },
        }
    }

    HealthReport {
        status: if any_disconnected { Status::Degraded } else { Status::Healthy },
        store_ok,
        channels: Some(channels),
    }
}
