//! Metric name and label definitions.
//!
//! Centralizing these definitions ensures consistency and makes it easier to
//! document what metrics are available across the gateway.

/// HTTP request metrics
pub mod http {
    pub const REQUESTS_TOTAL: &str = "chatgate_http_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "chatgate_http_request_duration_seconds";
    pub const REQUESTS_IN_FLIGHT: &str = "chatgate_http_requests_in_flight";
    pub const REQUEST_BYTES_TOTAL: &str = "chatgate_http_request_bytes_total";
    pub const RESPONSE_BYTES_TOTAL: &str = "chatgate_http_response_bytes_total";
}

/// WebSocket metrics
pub mod websocket {
    pub const CONNECTIONS_TOTAL: &str = "chatgate_websocket_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "chatgate_websocket_connections_active";
    pub const MESSAGES_RECEIVED_TOTAL: &str = "chatgate_websocket_messages_received_total";
    pub const MESSAGES_SENT_TOTAL: &str = "chatgate_websocket_messages_sent_total";
    pub const MESSAGE_DURATION_SECONDS: &str = "chatgate_websocket_message_duration_seconds";
}

/// Channel adapter metrics (bot, webchat, webhook)
pub mod channels {
    pub const MESSAGES_RECEIVED_TOTAL: &str = "chatgate_channel_messages_received_total";
    pub const MESSAGES_SENT_TOTAL: &str = "chatgate_channel_messages_sent_total";
    pub const ACTIVE: &str = "chatgate_channels_active";
    pub const ERRORS_TOTAL: &str = "chatgate_channel_errors_total";
    /// Outbound transport calls that hit a 429 and retried.
    pub const RATE_LIMITED_RETRIES_TOTAL: &str = "chatgate_channel_rate_limited_retries_total";
    /// Draft-stream edits actually flushed to the transport.
    pub const DRAFT_EDITS_TOTAL: &str = "chatgate_channel_draft_edits_total";
    /// Group messages dropped because the bot is not an admin.
    pub const GROUP_ADMIN_WARNINGS_TOTAL: &str = "chatgate_channel_group_admin_warnings_total";
}

/// Rate limiter metrics
pub mod ratelimit {
    pub const CHECKS_TOTAL: &str = "chatgate_ratelimit_checks_total";
    pub const REJECTIONS_TOTAL: &str = "chatgate_ratelimit_rejections_total";
    pub const BUCKETS_ACTIVE: &str = "chatgate_ratelimit_buckets_active";
    pub const SWEEP_EVICTIONS_TOTAL: &str = "chatgate_ratelimit_sweep_evictions_total";
}

/// Pairing service metrics
pub mod pairing {
    pub const REQUESTS_CREATED_TOTAL: &str = "chatgate_pairing_requests_created_total";
    pub const CODES_VALIDATED_TOTAL: &str = "chatgate_pairing_codes_validated_total";
    pub const CODES_EXPIRED_TOTAL: &str = "chatgate_pairing_codes_expired_total";
    pub const AUTO_APPROVALS_TOTAL: &str = "chatgate_pairing_auto_approvals_total";
    pub const WALLET_LINKS_TOTAL: &str = "chatgate_pairing_wallet_links_total";
    pub const REAPER_SWEEPS_TOTAL: &str = "chatgate_pairing_reaper_sweeps_total";
}

/// Menu / wizard state machine metrics
pub mod menu {
    pub const CALLBACKS_TOTAL: &str = "chatgate_menu_callbacks_total";
    pub const DISPATCH_ERRORS_TOTAL: &str = "chatgate_menu_dispatch_errors_total";
    pub const WIZARD_COMPLETIONS_TOTAL: &str = "chatgate_menu_wizard_completions_total";
    pub const WIZARD_FAILURES_TOTAL: &str = "chatgate_menu_wizard_failures_total";
    pub const ACTIVE_SESSIONS: &str = "chatgate_menu_active_sessions";
}

/// Gateway orchestrator metrics
pub mod gateway {
    pub const RELOADS_TOTAL: &str = "chatgate_gateway_reloads_total";
    pub const RELOAD_DURATION_SECONDS: &str = "chatgate_gateway_reload_duration_seconds";
    pub const RELOAD_COALESCED_TOTAL: &str = "chatgate_gateway_reload_coalesced_total";
    pub const SHUTDOWN_ERRORS_TOTAL: &str = "chatgate_gateway_shutdown_errors_total";
}

/// Protocol metrics
pub mod protocol {
    pub const FRAME_VALIDATION_ERRORS_TOTAL: &str = "chatgate_protocol_frame_validation_errors_total";
    pub const HANDSHAKE_DURATION_SECONDS: &str = "chatgate_protocol_handshake_duration_seconds";
    pub const HANDSHAKE_TIMEOUTS_TOTAL: &str = "chatgate_protocol_handshake_timeouts_total";
    pub const PAYLOAD_SIZE_VIOLATIONS_TOTAL: &str = "chatgate_protocol_payload_size_violations_total";
    pub const DEDUPE_OPERATIONS_TOTAL: &str = "chatgate_protocol_dedupe_operations_total";
}

/// Config loading metrics
pub mod config {
    pub const LOAD_DURATION_SECONDS: &str = "chatgate_config_load_duration_seconds";
    pub const PARSE_ERRORS_TOTAL: &str = "chatgate_config_parse_errors_total";
    pub const ENV_SUBSTITUTION_FAILURES_TOTAL: &str =
        "chatgate_config_env_substitution_failures_total";
    pub const RELOAD_DURATION_SECONDS: &str = "chatgate_config_reload_duration_seconds";
    pub const VALIDATION_ERRORS_TOTAL: &str = "chatgate_config_validation_errors_total";
}

/// System-level metrics
pub mod system {
    pub const UPTIME_SECONDS: &str = "chatgate_uptime_seconds";
    pub const BUILD_INFO: &str = "chatgate_build_info";
    pub const CONNECTED_CLIENTS: &str = "chatgate_connected_clients";
}

/// Common/shared metrics
pub mod common {
    pub const ERRORS_TOTAL: &str = "chatgate_errors_total";
    pub const VALIDATION_FAILURES_TOTAL: &str = "chatgate_validation_failures_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const METHOD: &str = "method";
    pub const STATUS: &str = "status";
    pub const CHANNEL: &str = "channel";
    pub const ERROR_TYPE: &str = "error_type";
    pub const OPERATION: &str = "operation";
    pub const FORMAT: &str = "format";
    pub const FRAME_TYPE: &str = "frame_type";
    pub const ACCOUNT_ID: &str = "account_id";
    pub const ACTION: &str = "action";
    pub const REASON: &str = "reason";
}

/// Standard histogram buckets for different metric types
pub mod buckets {
    use once_cell::sync::Lazy;

    /// HTTP / transport request duration buckets (in seconds), 1ms to 60s.
    pub static HTTP_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// Queue/backlog size buckets, 1 to 10000.
    pub static QUEUE_SIZE: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 10000.0,
        ]
    });
}
