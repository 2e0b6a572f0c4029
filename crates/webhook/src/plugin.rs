//! [`ChannelPlugin`] implementation for the generic automation webhook
//! adapter, plus the synchronous request/response entry point the
//! gateway's `POST /webhook/:integration` route delegates to.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{RwLock, oneshot};

use chatgate_channels::{
    ChannelEventSink, ChannelHealthSnapshot, ChannelPlugin, ChannelStatus, ChannelTransport,
};
use chatgate_commands::CommandRegistry;
use chatgate_ratelimit::bucket::{RateLimiter, RateLimiterConfig};

use crate::{
    config::WebhookAccountConfig,
    ingress,
    transport::{PendingMap, WebhookTransport},
};

struct AccountState {
    config: WebhookAccountConfig,
    pending: PendingMap,
    transport: Arc<WebhookTransport>,
}

/// Error returned by [`WebhookPlugin::handle_request`]; the gateway maps
/// these to HTTP status codes at the router boundary.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("unknown webhook integration {0}")]
    UnknownIntegration(String),
    #[error("invalid or missing shared secret")]
    Unauthorized,
    #[error("timed out waiting for a reply")]
    Timeout,
}

/// Channel plugin for generic automation webhooks (§4.1, adapter G).
pub struct WebhookPlugin {
    accounts: RwLock<HashMap<String, AccountState>>,
    commands: Arc<CommandRegistry>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
}

impl WebhookPlugin {
    #[must_use]
    pub fn new(commands: Arc<CommandRegistry>) -> Self {
        Self { accounts: RwLock::new(HashMap::new()), commands, event_sink: None }
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Handle one inbound HTTP call against integration `account_id`.
    /// `secret` is whatever the caller presented in the configured header
    /// (`config::SECRET_HEADER`), if any. Blocks until a reply is produced
    /// or the integration's `response_timeout_secs` elapses.
    pub async fn handle_request(&self, account_id: &str, secret: Option<&str>, text: &str) -> Result<String, WebhookError> {
        let (pending, shared_secret, timeout_secs) = {
            let accounts = self.accounts.read().await;
            let state = accounts.get(account_id).ok_or_else(|| WebhookError::UnknownIntegration(account_id.to_string()))?;
            (state.pending.clone(), state.config.shared_secret.clone(), state.config.response_timeout_secs)
        };

        if let Some(expected) = shared_secret.as_deref() {
            if secret != Some(expected) {
                return Err(WebhookError::Unauthorized);
            }
        }

        let chat_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        pending.insert(chat_id.clone(), tx);

        if let Some(reply) = ingress::handle_inbound(account_id, &chat_id, text, &self.commands, self.event_sink.as_ref()).await {
            pending.remove(&chat_id);
            return Ok(reply);
        }

        match tokio::time::timeout(Duration::from_secs(timeout_secs), rx).await {
            Ok(Ok(reply)) => Ok(reply),
            _ => {
                pending.remove(&chat_id);
                Err(WebhookError::Timeout)
            },
        }
    }
}

#[async_trait]
impl ChannelPlugin for WebhookPlugin {
    fn id(&self) -> &str {
        "webhook"
    }

    fn name(&self) -> &str {
        "Webhook"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> anyhow::Result<()> {
        let parsed: WebhookAccountConfig = serde_json::from_value(config)?;
        let pending: PendingMap = Arc::new(dashmap::DashMap::new());
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));
        let transport = Arc::new(WebhookTransport::new(pending.clone(), limiter));
        self.accounts
            .write()
            .await
            .insert(account_id.to_string(), AccountState { config: parsed, pending, transport });
        tracing::info!(account_id, "webhook integration registered");
        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> anyhow::Result<()> {
        self.accounts.write().await.remove(account_id);
        Ok(())
    }

    fn outbound(&self, account_id: &str) -> Option<Arc<dyn ChannelTransport>> {
        self.accounts.try_read().ok().and_then(|accounts| {
            accounts.get(account_id).map(|s| Arc::clone(&s.transport) as Arc<dyn ChannelTransport>)
        })
    }

    async fn handle_http(&self, account_id: &str, secret: Option<&str>, body: &str) -> anyhow::Result<String> {
        self.handle_request(account_id, secret, body).await.map_err(Into::into)
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for WebhookPlugin {
    async fn probe(&self, account_id: &str) -> anyhow::Result<ChannelHealthSnapshot> {
        let accounts = self.accounts.read().await;
        match accounts.get(account_id) {
            Some(state) => Ok(ChannelHealthSnapshot {
                connected: true,
                account_id: account_id.to_string(),
                details: Some(format!("{} in-flight call(s)", state.pending.len())),
            }),
            None => Ok(ChannelHealthSnapshot { connected: false, account_id: account_id.to_string(), details: Some("integration not registered".into()) }),
        }
    }
}
