//! [`ChannelEventSink`] implementation — the seam every adapter hands off
//! to once its own access-control and command-registry dispatch has run
//! (§4.4 "Ingress callback", steps 1/2/4; step 3 already happened inside
//! the adapter, see `crates/bot/src/handlers.rs`).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use chatgate_channels::{ChannelEvent, ChannelEventSink, ChannelMessageMeta, ChannelReplyTarget};
use chatgate_commands::{CommandContext, CommandRegistry};
use chatgate_common::collaborators::AgentManager;
use chatgate_ratelimit::{bucket::RateLimiter, retry::MIN_GATE_WAIT};

#[cfg(feature = "metrics")]
use chatgate_metrics::{channels as ch_metrics, counter, labels};

/// Capacity of the broadcast channel `emit` publishes onto. A slow or
/// absent subscriber (no UI attached to `/ws`) never blocks ingress —
/// `broadcast::Sender::send` only fails when there are zero receivers,
/// which is the common case for a headless deployment.
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct GatewayEventSink {
    ingress_limiter: RateLimiter,
    commands: Arc<CommandRegistry>,
    agent: Arc<dyn AgentManager>,
    events: broadcast::Sender<ChannelEvent>,
}

impl GatewayEventSink {
    #[must_use]
    pub fn new(ingress_limiter: RateLimiter, commands: Arc<CommandRegistry>, agent: Arc<dyn AgentManager>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { ingress_limiter, commands, agent, events }
    }

    /// Subscribe to the real-time event stream, e.g. from the `/ws` control
    /// route's event-fan-out task.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ChannelEventSink for GatewayEventSink {
    async fn emit(&self, event: ChannelEvent) {
        // No receivers is the normal case when nothing is attached to /ws.
        let _ = self.events.send(event);
    }

    async fn dispatch_to_chat(&self, text: &str, reply_to: ChannelReplyTarget, meta: ChannelMessageMeta) {
        let key = self.ingress_limiter.key_for(&reply_to.chat_id);
        let gate = self.ingress_limiter.check(&key);
        if !gate.allowed {
            debug!(
                channel = %reply_to.channel_type,
                account_id = %reply_to.account_id,
                chat_id = %reply_to.chat_id,
                reset_in_ms = gate.reset_in.as_millis(),
                "ingress: rate-gated, waiting before forwarding to agent"
            );
            tokio::time::sleep(gate.reset_in.max(MIN_GATE_WAIT)).await;
        }

        #[cfg(feature = "metrics")]
        counter!(ch_metrics::MESSAGES_RECEIVED_TOTAL, labels::CHANNEL => reply_to.channel_type.clone()).increment(1);

        let session = format!("{}:{}:{}", reply_to.channel_type, reply_to.account_id, reply_to.chat_id);
        match self.agent.handle_message(text, &session).await {
            Ok(Some(reply)) if !reply.is_empty() => {
                self.emit(ChannelEvent::InboundMessage {
                    channel_type: reply_to.channel_type,
                    account_id: reply_to.account_id,
                    peer_id: reply_to.chat_id,
                    username: meta.username,
                    sender_name: meta.sender_name,
                    message_count: None,
                    access_granted: true,
                })
                .await;
                debug!(session, reply_len = reply.len(), "agent produced a reply");
            },
            Ok(_) => {
                debug!(session, "agent produced no reply");
            },
            Err(err) => {
                warn!(session, error = %err, "agent collaborator failed");
            },
        }
    }

    async fn dispatch_command(&self, command: &str, reply_to: ChannelReplyTarget) -> anyhow::Result<String> {
        let ctx = CommandContext {
            channel: reply_to.account_id.clone(),
            user_id: reply_to.chat_id.clone(),
            chat_id: reply_to.chat_id,
            username: None,
            args: String::new(),
        };
        let raw = format!("/{command}");
        match self.commands.dispatch(&raw, ctx).await {
            Some(result) => result.map_err(Into::into),
            None => Ok(format!("unknown command: {command}")),
        }
    }

    async fn request_disable_account(&self, channel_type: &str, account_id: &str, reason: &str) {
        warn!(channel_type, account_id, reason, "channel account disable requested");
        self.emit(ChannelEvent::AccountDisabled {
            channel_type: channel_type.to_string(),
            account_id: account_id.to_string(),
            reason: reason.to_string(),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_channels::ChannelEventSink as _;
    use chatgate_pairing::PairingService;
    use chatgate_ratelimit::bucket::RateLimiterConfig;
    use chatgate_store::Store;

    struct EchoAgent;

    #[async_trait]
    impl AgentManager for EchoAgent {
        async fn handle_message(&self, message: &str, _session: &str) -> anyhow::Result<Option<String>> {
            Ok(Some(format!("echo: {message}")))
        }
        async fn reload_config(&self, _config: serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
        async fn reload_skills(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn dispose(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn sink() -> GatewayEventSink {
        let store = Store::in_memory().await.unwrap();
        let pairing = PairingService::new(store);
        let menu = chatgate_menu::MenuService::new(
            Arc::new(crate::collaborators::NullFeedManager),
            Arc::new(crate::collaborators::NullExecutionService),
            Arc::new(crate::collaborators::NullCredentialsManager),
            Arc::new(crate::collaborators::NullCopyTradingOrchestrator),
        );
        let commands = Arc::new(CommandRegistry::new(pairing, menu));
        let limiter = RateLimiter::new(RateLimiterConfig { max_requests: u32::MAX, window_ms: 60_000, per_user: true });
        GatewayEventSink::new(limiter, commands, Arc::new(EchoAgent))
    }

    #[tokio::test]
    async fn dispatch_to_chat_forwards_to_agent_and_emits_event() {
        let sink = sink().await;
        let mut rx = sink.subscribe();
        sink.dispatch_to_chat(
            "hello",
            ChannelReplyTarget { channel_type: "bot".into(), account_id: "main".into(), chat_id: "c1".into() },
            ChannelMessageMeta { channel_type: "bot".into(), sender_name: None, username: None, model: None },
        )
        .await;
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, ChannelEvent::InboundMessage { .. }));
    }

    #[tokio::test]
    async fn unknown_dispatch_command_reports_rather_than_errors() {
        let sink = sink().await;
        let reply = sink
            .dispatch_command("frobnicate", ChannelReplyTarget { channel_type: "bot".into(), account_id: "main".into(), chat_id: "c1".into() })
            .await
            .unwrap();
        assert!(reply.contains("unknown command"));
    }
}
