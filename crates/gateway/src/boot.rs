//! Boot sequence (§4.4 "Boot order"): open the store, construct the
//! services built on top of it, start every configured channel account,
//! bring up the HTTP/WS surface, and install the hot-reload watcher —
//! strictly in that order, since each step depends on the one before it.

use std::{path::Path, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tracing::{info, warn};

use chatgate_bot::plugin::BotPlugin;
use chatgate_channels::{message_log::MessageLog, registry::ChannelRegistry};
use chatgate_commands::CommandRegistry;
use chatgate_config::schema::ChatgateConfig;
use chatgate_menu::MenuService;
use chatgate_pairing::{PairingService, spawn_reaper};
use chatgate_ratelimit::bucket::{RateLimiter, RateLimiterConfig};
use chatgate_store::{SqliteMessageLog, Store};
use chatgate_webchat::plugin::WebchatPlugin;
use chatgate_webhook::plugin::WebhookPlugin;

use crate::{
    collaborators::Collaborators,
    config_bridge,
    error::{Error, Result},
    event_sink::GatewayEventSink,
    http,
    reload::ReloadCoordinator,
    state::{GatewayState, SharedState},
};

/// Everything `boot` started, owned by the caller so it can later be passed
/// to `shutdown` for an orderly, idempotent teardown.
pub struct Gateway {
    pub state: SharedState,
    pub(crate) http: http::ServerHandle,
    pub(crate) reaper: tokio::task::JoinHandle<()>,
    pub(crate) reload: ReloadCoordinator,
}

/// Step 1-6 of §4.4's boot order. `config_path` is watched for hot reload
/// once boot succeeds; pass `None` to disable file watching (e.g. tests).
pub async fn boot(config: ChatgateConfig, config_path: Option<&Path>, collaborators: Collaborators) -> Result<Gateway> {
    // 1. Open the persistent store.
    let store = if config.store.path == ":memory:" {
        Store::in_memory().await?
    } else {
        Store::open(Path::new(&config.store.path)).await?
    };
    info!(path = %config.store.path, "store opened");

    // 2. Construct the pairing service and start its reaper.
    let pairing = PairingService::new(store.clone());
    let reaper = spawn_reaper(pairing.clone(), Duration::from_secs(config.pairing.reaper_interval_secs.max(1)));
    let pairing = Arc::new(pairing);

    // 3. Construct the menu/command layer on top of the collaborators.
    let menu = Arc::new(MenuService::new(
        Arc::clone(&collaborators.feed),
        Arc::clone(&collaborators.execution),
        Arc::clone(&collaborators.credentials),
        Arc::clone(&collaborators.copy_trading),
    ));
    let commands = Arc::new(CommandRegistry::new((*pairing).clone(), (*menu).clone()));

    let ingress_limiter = RateLimiter::new(RateLimiterConfig {
        max_requests: config.ratelimit.max_requests,
        window_ms: config.ratelimit.window_ms,
        per_user: config.ratelimit.per_user,
    });
    let event_sink = Arc::new(GatewayEventSink::new(ingress_limiter, Arc::clone(&commands), Arc::clone(&collaborators.agent)));

    // 4. Register channel adapters (not yet started — no accounts attached).
    let message_log: Arc<dyn MessageLog> = Arc::new(SqliteMessageLog::new(store.clone()));
    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(
        BotPlugin::new(Arc::clone(&pairing), Arc::clone(&menu), Arc::clone(&commands))
            .with_message_log(Arc::clone(&message_log))
            .with_event_sink(Arc::clone(&event_sink) as _),
    ));
    registry.register(Box::new(
        WebchatPlugin::new(Arc::clone(&menu), Arc::clone(&commands))
            .with_message_log(Arc::clone(&message_log))
            .with_event_sink(Arc::clone(&event_sink) as _),
    ));
    registry.register(Box::new(
        WebhookPlugin::new(Arc::clone(&commands)).with_event_sink(Arc::clone(&event_sink) as _),
    ));

    // 5. Start every configured channel account. A single account failing
    // to start is logged and skipped rather than aborting the whole boot,
    // so one bad token doesn't take down every other channel.
    let mut started_accounts = Vec::new();
    for spec in config_bridge::account_specs(&config) {
        match registry.get_mut(spec.channel_type) {
            Some(plugin) => match plugin.start_account(&spec.account_id, spec.config).await {
                Ok(()) => started_accounts.push((spec.channel_type.to_string(), spec.account_id)),
                Err(source) => {
                    warn!(channel = spec.channel_type, account_id = %spec.account_id, error = %source, "channel account failed to start");
                },
            },
            None => warn!(channel = spec.channel_type, "no plugin registered for channel type"),
        }
    }

    #[cfg(feature = "metrics")]
    let metrics_handle = chatgate_metrics::init_metrics(chatgate_metrics::MetricsRecorderConfig {
        enabled: true,
        prefix: None,
        global_labels: Vec::new(),
    })
    .map_err(Error::Other)?;

    let state: SharedState = Arc::new(GatewayState {
        store,
        pairing,
        menu,
        commands,
        channels: RwLock::new(registry),
        started_accounts: RwLock::new(started_accounts),
        event_sink,
        collaborators,
        #[cfg(feature = "metrics")]
        metrics: metrics_handle,
        config: RwLock::new(Arc::new(config.clone())),
    });

    // 6. Bring up the HTTP/WS surface, then install the hot-reload watcher.
    let http_handle = http::serve(Arc::clone(&state)).await.map_err(Error::Io)?;
    let reload = ReloadCoordinator::spawn(Arc::clone(&state), config_path, config.hot_reload.clone());

    Ok(Gateway { state, http: http_handle, reaper, reload })
}
