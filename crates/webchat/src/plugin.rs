//! [`ChannelPlugin`] implementation for the webchat adapter, plus the
//! WebSocket connection pump the gateway's `/chat` route delegates to.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};

use chatgate_channels::{
    ChannelEventSink, ChannelHealthSnapshot, ChannelPlugin, ChannelStatus, ChannelTransport,
    message_log::MessageLog,
};
use chatgate_commands::CommandRegistry;
use chatgate_menu::MenuService;
use chatgate_ratelimit::bucket::{RateLimiter, RateLimiterConfig};

use crate::{
    config::WebchatAccountConfig,
    frame::ServerFrame,
    ingress::{self, IngressDeps},
    transport::{ConnectionMap, WebchatTransport},
};

struct AccountState {
    config: WebchatAccountConfig,
    connections: ConnectionMap,
    transport: Arc<WebchatTransport>,
}

/// Channel plugin for the webchat adapter (§4.1, adapter F).
pub struct WebchatPlugin {
    accounts: RwLock<HashMap<String, AccountState>>,
    message_log: Option<Arc<dyn MessageLog>>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    deps: Arc<IngressDeps>,
}

impl WebchatPlugin {
    #[must_use]
    pub fn new(menu: Arc<MenuService>, commands: Arc<CommandRegistry>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            message_log: None,
            event_sink: None,
            deps: Arc::new(IngressDeps { menu, commands }),
        }
    }

    #[must_use]
    pub fn with_message_log(mut self, log: Arc<dyn MessageLog>) -> Self {
        self.message_log = Some(log);
        self
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Accept an upgraded WebSocket for `account_id`, pumping inbound
    /// frames through the ingress chain and outbound frames from whichever
    /// [`WebchatTransport`] call targets this connection's chat id. Returns
    /// once the socket closes.
    pub async fn run_connection(&self, account_id: &str, socket: WebSocket) {
        let (connections, transport) = {
            let accounts = self.accounts.read().await;
            let Some(state) = accounts.get(account_id) else {
                tracing::warn!(account_id, "webchat: connection for unknown account, closing");
                return;
            };
            (state.connections.clone(), Arc::clone(&state.transport) as Arc<dyn ChannelTransport>)
        };

        let chat_id = uuid::Uuid::new_v4().to_string();
        let user_id = chat_id.clone();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();
        connections.insert(chat_id.clone(), tx);

        let (mut write, mut read) = socket.split();
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(msg)) = read.next().await {
            let Message::Text(raw) = msg else { continue };
            match serde_json::from_str(&raw) {
                Ok(frame) => {
                    ingress::handle_inbound(
                        account_id,
                        &chat_id,
                        &user_id,
                        frame,
                        &self.deps,
                        &transport,
                        self.message_log.as_ref(),
                        self.event_sink.as_ref(),
                    )
                    .await;
                },
                Err(err) => {
                    tracing::debug!(account_id, chat_id, error = %err, "webchat: ignoring malformed frame");
                },
            }
        }

        connections.remove(&chat_id);
        writer.abort();
    }
}

#[async_trait]
impl ChannelPlugin for WebchatPlugin {
    fn id(&self) -> &str {
        "webchat"
    }

    fn name(&self) -> &str {
        "Webchat"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> anyhow::Result<()> {
        let parsed: WebchatAccountConfig = serde_json::from_value(config)?;
        let connections: ConnectionMap = Arc::new(dashmap::DashMap::new());
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));
        let transport = Arc::new(WebchatTransport::new(connections.clone(), limiter));
        self.accounts
            .write()
            .await
            .insert(account_id.to_string(), AccountState { config: parsed, connections, transport });
        tracing::info!(account_id, "webchat account registered");
        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> anyhow::Result<()> {
        self.accounts.write().await.remove(account_id);
        Ok(())
    }

    fn outbound(&self, account_id: &str) -> Option<Arc<dyn ChannelTransport>> {
        // `accounts` is a tokio RwLock; `blocking_read` would deadlock on
        // the async runtime, so callers needing this synchronously should
        // go through `run_connection`'s captured transport instead. This
        // path is exercised by the gateway's health/outbound plumbing,
        // which already runs inside an async context.
        self.accounts.try_read().ok().and_then(|accounts| {
            accounts.get(account_id).map(|s| Arc::clone(&s.transport) as Arc<dyn ChannelTransport>)
        })
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for WebchatPlugin {
    async fn probe(&self, account_id: &str) -> anyhow::Result<ChannelHealthSnapshot> {
        let accounts = self.accounts.read().await;
        match accounts.get(account_id) {
            Some(state) => Ok(ChannelHealthSnapshot {
                connected: !state.connections.is_empty(),
                account_id: account_id.to_string(),
                details: Some(format!("{} open connection(s), path {}", state.connections.len(), state.config.path)),
            }),
            None => Ok(ChannelHealthSnapshot { connected: false, account_id: account_id.to_string(), details: Some("account not started".into()) }),
        }
    }
}
