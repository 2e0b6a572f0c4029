//! The three WebSocket upgrade paths (§6.3): `/ws` (operator control
//! plane), `/chat` (webchat channel, delegated to the webchat plugin's own
//! connection pump), and `/api/ticks/stream` (heartbeat-only tick feed).

use std::time::Duration;

use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tokio::time::interval;

use chatgate_protocol::{
    ConnectParams, EventFrame, Features, HelloOk, Policy, PROTOCOL_VERSION, RequestFrameInner, ResponseFrameInner,
    ServerInfo, error_codes,
};
use chatgate_webchat::plugin::WebchatPlugin;

use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/ws", get(control_ws))
        .route("/chat", get(chat_ws))
        .route("/api/ticks/stream", get(ticks_ws))
}

async fn control_ws(State(state): State<SharedState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_control(state, socket))
}

/// Handshake then fan out `ChannelEvent`s as `EventFrame`s for the
/// lifetime of the connection. The RPC surface is intentionally small:
/// anything beyond `connect` gets an `INVALID_REQUEST` response rather
/// than silently hanging up, since clients should be able to tell a
/// rejected method apart from a dropped connection.
async fn run_control(state: SharedState, mut socket: WebSocket) {
    let conn_id = uuid::Uuid::new_v4().to_string();

    let hello_ok = match tokio::time::timeout(Duration::from_millis(chatgate_protocol::HANDSHAKE_TIMEOUT_MS), socket.recv()).await {
        Ok(Some(Ok(Message::Text(raw)))) => match serde_json::from_str::<RequestFrameInner>(&raw) {
            Ok(req) if req.method == "connect" => {
                let params: Option<ConnectParams> = req.params.and_then(|p| serde_json::from_value(p).ok());
                match params {
                    Some(params) if params.min_protocol <= PROTOCOL_VERSION && params.max_protocol >= PROTOCOL_VERSION => Some(req.id),
                    _ => None,
                }
            },
            _ => None,
        },
        _ => None,
    };

    let Some(req_id) = hello_ok else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let hello = HelloOk {
        r#type: "hello-ok".into(),
        protocol: PROTOCOL_VERSION,
        server: ServerInfo { version: env!("CARGO_PKG_VERSION").into(), commit: None, host: None, conn_id: conn_id.clone() },
        features: Features { methods: vec!["ping".into()], events: vec!["inbound_message".into(), "account_disabled".into()] },
        snapshot: serde_json::json!({}),
        canvas_host_url: None,
        auth: None,
        policy: Policy::default_policy(),
    };
    let ack = ResponseFrameInner { id: req_id, ok: true, payload: serde_json::to_value(&hello).ok(), error: None };
    if send_response(&mut socket, &ack).await.is_err() {
        return;
    }

    let mut events = state.event_sink.subscribe();
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Ok(event) = event else { break };
                seq += 1;
                let Ok(payload) = serde_json::to_value(&event) else { continue };
                let name = match &event {
                    chatgate_channels::ChannelEvent::InboundMessage { .. } => "inbound_message",
                    chatgate_channels::ChannelEvent::AccountDisabled { .. } => "account_disabled",
                    chatgate_channels::ChannelEvent::OtpChallenge { .. } => "otp_challenge",
                    chatgate_channels::ChannelEvent::OtpResolved { .. } => "otp_resolved",
                };
                let frame = EventFrame::new(name, payload, seq);
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(raw))) => {
                        if let Ok(req) = serde_json::from_str::<RequestFrameInner>(&raw) {
                            let resp = handle_request(req);
                            if send_response(&mut socket, &resp).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

fn handle_request(req: RequestFrameInner) -> ResponseFrameInner {
    match req.method.as_str() {
        "ping" => ResponseFrameInner { id: req.id, ok: true, payload: Some(serde_json::json!({ "pong": true })), error: None },
        other => ResponseFrameInner {
            id: req.id,
            ok: false,
            payload: None,
            error: Some(chatgate_protocol::ErrorShape::new(error_codes::INVALID_REQUEST, format!("unknown method: {other}"))),
        },
    }
}

async fn send_response(socket: &mut WebSocket, resp: &ResponseFrameInner) -> Result<(), axum::Error> {
    let text = serde_json::to_string(resp).unwrap_or_default();
    socket.send(Message::Text(text.into())).await
}

#[derive(Debug, Deserialize)]
struct ChatQuery {
    account: Option<String>,
}

async fn chat_ws(State(state): State<SharedState>, Query(query): Query<ChatQuery>, ws: WebSocketUpgrade) -> Response {
    let account_id = query.account.unwrap_or_else(|| "default".to_string());
    ws.on_upgrade(move |socket| async move {
        // Held for the lifetime of the connection: webchat's own pump
        // needs `&WebchatPlugin` throughout, and the registry is the sole
        // owner of the concrete plugin. A long-lived chat connection can
        // therefore delay a concurrent hot reload until it closes.
        let registry = state.channels.read().await;
        let Some(plugin) = registry.get("webchat").and_then(|p| p.as_any().downcast_ref::<WebchatPlugin>()) else {
            tracing::warn!("webchat plugin not registered, closing /chat connection");
            return;
        };
        plugin.run_connection(&account_id, socket).await;
    })
}

async fn ticks_ws(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(run_ticks)
}

/// No live feed manager exists yet (§9 "ticks"), so this is a bare
/// heartbeat at the protocol's tick interval to keep clients' liveness
/// checks happy rather than a real price/quote feed.
async fn run_ticks(mut socket: WebSocket) {
    let mut ticker = interval(Duration::from_millis(chatgate_protocol::TICK_INTERVAL_MS));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = EventFrame::new("tick", serde_json::json!({ "ts": chrono::Utc::now().to_rfc3339() }), 0);
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
