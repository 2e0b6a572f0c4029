//! Plain REST routes (§6.3): health, metrics, the two webhook-style
//! ingress paths, and the wallet-scoped pairing/copy-trading APIs.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::{health, state::SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/channels/{platform}", post(channel_ingress))
        .route("/webhook/{integration}", post(webhook_ingress))
        .route("/webhook", post(webhook_ingress_no_integration))
        .route("/api/v1/pairing/code", post(create_pairing_code))
        .route("/api/v1/pairing/linked", get(list_linked))
        .route("/api/v1/pairing/linked/{channel}/{user_id}", delete(unlink))
        .route("/api/v1/pairing/status/{code}", get(pairing_status))
        .route("/api/v1/copy-trading/configs", get(list_copy_configs).post(create_copy_config))
        .route("/api/v1/copy-trading/configs/{id}", delete(delete_copy_config).patch(update_copy_config))
        .route("/api/v1/copy-trading/configs/{id}/toggle", post(toggle_copy_config))
}

#[derive(Debug, Deserialize)]
struct HealthQuery {
    #[serde(default)]
    deep: bool,
}

async fn health_handler(State(state): State<SharedState>, Query(query): Query<HealthQuery>) -> impl IntoResponse {
    let report = health::check(&state, query.deep).await;
    let code = match report.status {
        health::Status::Healthy => StatusCode::OK,
        health::Status::Degraded => StatusCode::OK,
        health::Status::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

async fn metrics_handler(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let config = state.current_config().await;
    if let Some(expected) = &config.auth.metrics_token {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    #[cfg(feature = "metrics")]
    {
        state.metrics.render().into_response()
    }
    #[cfg(not(feature = "metrics"))]
    {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// `POST /channels/:platform` — channel webhook ingress; body is opaque
/// per platform. Delegates to whichever plugin is registered under that
/// id; adapters that don't accept inbound HTTP (bot, webchat) reject it
/// via `ChannelPlugin::handle_http`'s default.
async fn channel_ingress(
    State(state): State<SharedState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    dispatch_http_ingress(&state, &platform, &platform, &headers, &body).await
}

async fn webhook_ingress(
    State(state): State<SharedState>,
    Path(integration): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    dispatch_http_ingress(&state, "webhook", &integration, &headers, &body).await
}

async fn webhook_ingress_no_integration(State(state): State<SharedState>, headers: HeaderMap, body: String) -> Response {
    dispatch_http_ingress(&state, "webhook", "default", &headers, &body).await
}

async fn dispatch_http_ingress(
    state: &SharedState,
    channel_type: &str,
    account_id: &str,
    headers: &HeaderMap,
    body: &str,
) -> Response {
    let secret = headers.get(chatgate_webhook::config::SECRET_HEADER).and_then(|v| v.to_str().ok());
    let registry = state.channels.read().await;
    let Some(plugin) = registry.get(channel_type) else {
        return (StatusCode::NOT_FOUND, format!("unknown channel: {channel_type}")).into_response();
    };
    match plugin.handle_http(account_id, secret, body).await {
        Ok(reply) => reply.into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

fn wallet_address(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get("x-wallet-address")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing x-wallet-address header").into_response())
}

async fn create_pairing_code(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let wallet = match wallet_address(&headers) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match state.pairing.create_wallet_pairing_code(&wallet).await {
        Ok(code) => Json(json!({ "code": code })).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn list_linked(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let wallet = match wallet_address(&headers) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match state.pairing.get_chat_users_for_wallet(&wallet).await {
        Ok(rows) => Json(
            rows.into_iter()
                .map(|r| json!({ "channel": r.channel, "chatUserId": r.chat_user_id, "linkedAt": r.linked_at, "linkedBy": r.linked_by }))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn unlink(State(state): State<SharedState>, Path((channel, user_id)): Path<(String, String)>) -> Response {
    match state.pairing.unlink_chat_user(&channel, &user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn pairing_status(State(state): State<SharedState>, Path(code): Path<String>) -> Response {
    let normalized = chatgate_pairing::code::normalize(&code);
    match chatgate_store::wallet_pairing_codes::code_exists(state.store.pool(), &normalized).await {
        Ok(exists) => Json(json!({ "pending": exists })).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn list_copy_configs(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let wallet = match wallet_address(&headers) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match state.collaborators.copy_trading.list_configs(&wallet).await {
        Ok(configs) => Json(configs).into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

async fn create_copy_config(State(state): State<SharedState>, headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Response {
    let wallet = match wallet_address(&headers) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match state.collaborators.copy_trading.create_config(&wallet, body).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

async fn update_copy_config(State(state): State<SharedState>, Path(id): Path<String>, Json(body): Json<serde_json::Value>) -> Response {
    match state.collaborators.copy_trading.update_config(&id, body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

async fn delete_copy_config(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    match state.collaborators.copy_trading.delete_config(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    enabled: bool,
}

async fn toggle_copy_config(State(state): State<SharedState>, Path(id): Path<String>, Json(body): Json<ToggleBody>) -> Response {
    match state.collaborators.copy_trading.toggle_config(&id, body.enabled).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}
