//! Default configuration template with all options documented.
//!
//! This template is used when creating a new config file. It includes all
//! available options with descriptions, allowing users to see everything
//! that can be configured even if they don't change the defaults.

/// Generate the default config template with a specific port.
pub fn default_config_template(port: u16) -> String {
    format!(
        r##"# Chatgate Configuration
# ====================
# This file contains all available configuration options.
# Uncomment and modify settings as needed.
# Changes require a restart (or hot-reload debounce) to take effect.
#
# Environment variable substitution is supported: ${{ENV_VAR}}
# Example: bot_token = "${{TELEGRAM_BOT_TOKEN}}"

# ══════════════════════════════════════════════════════════════════════════════
# SERVER
# ══════════════════════════════════════════════════════════════════════════════

[server]
bind = "127.0.0.1"                # Address to bind to ("0.0.0.0" for all interfaces)
port = {port}                           # Port number
http_request_logs = false              # Enable verbose HTTP request/response logs (debugging)
behind_proxy = false                   # true if reverse-proxied; disables loopback-based local auto-approval

# ══════════════════════════════════════════════════════════════════════════════
# STORE
# ══════════════════════════════════════════════════════════════════════════════

[store]
path = "chatgate.db"               # Sqlite file path, or ":memory:" for an ephemeral store
busy_timeout_ms = 5000

# ══════════════════════════════════════════════════════════════════════════════
# AUTHENTICATION
# ══════════════════════════════════════════════════════════════════════════════

[auth]
# metrics_token = "..."            # Bearer token required on GET /metrics (unset = no auth)

# ══════════════════════════════════════════════════════════════════════════════
# TLS / HTTPS
# ══════════════════════════════════════════════════════════════════════════════

[tls]
enabled = false                   # Enable HTTPS
auto_generate = false             # Auto-generate local CA and server certificate
# cert_path = "/path/to/cert.pem"     # Custom certificate file (overrides auto-gen)
# key_path = "/path/to/key.pem"       # Custom private key file
# ca_cert_path = "/path/to/ca.pem"    # CA certificate for trust instructions

# ══════════════════════════════════════════════════════════════════════════════
# RATE LIMITING
# ══════════════════════════════════════════════════════════════════════════════
# Default token-bucket policy applied to every outbound channel call unless a
# channel overrides it below.

[ratelimit]
max_requests = 20                 # Requests allowed per window
window_ms = 60000                 # Window length in milliseconds
per_user = true                   # Bucket per chat/user (false = one global bucket)

# ══════════════════════════════════════════════════════════════════════════════
# PAIRING
# ══════════════════════════════════════════════════════════════════════════════

[pairing]
max_pending_per_channel = 3       # Max outstanding pairing requests per channel
code_ttl_secs = 3600              # Pairing code lifetime
auto_approve_local = false        # Auto-approve connections from loopback sources
auto_approve_tailscale = false    # Auto-approve connections from the Tailscale CGNAT range
promote_to_owner = false          # Auto-approved users get owner trust instead of paired
reaper_interval_secs = 60         # How often expired codes/requests are swept

# ══════════════════════════════════════════════════════════════════════════════
# HOT RELOAD
# ══════════════════════════════════════════════════════════════════════════════

[hot_reload]
config_debounce_ms = 250          # Debounce before reloading config on file change
skills_debounce_ms = 150          # Debounce before reloading skills/extensions
skill_paths = []                  # Additional paths to watch for skill reload

# ══════════════════════════════════════════════════════════════════════════════
# CHANNELS
# ══════════════════════════════════════════════════════════════════════════════
# External messaging integrations.

# Telegram-style bot accounts, keyed by account id.
# [channels.telegram.my-bot]
# bot_token = "${{TELEGRAM_BOT_TOKEN}}"
# dm_policy = "pairing"            # "open" | "allowlist" | "pairing" | "disabled"
# group_requires_mention = true
# allowlist = []

# [channels.webchat]
# path = "/chat"

# Generic automation webhook integrations, keyed by integration name
# (used as the :platform path segment under POST /webhook/:platform).
# [channels.webhook.my-integration]
# shared_secret = "${{MY_INTEGRATION_SECRET}}"
"##
    )
}
