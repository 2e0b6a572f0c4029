//! Configuration validation engine.
//!
//! Validates TOML configuration files against the known schema, detects
//! unknown/misspelled fields, and reports semantic warnings (§10.3).

use std::{collections::HashMap, path::Path};

use crate::schema::ChatgateConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "server.bnd"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with dynamic keys whose values have a known shape.
    Map(Box<KnownKeys>),
    /// Scalar value — stop recursion.
    Leaf,
}

/// Build the full schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    let ratelimit = || {
        Struct(HashMap::from([
            ("max_requests", Leaf),
            ("window_ms", Leaf),
            ("per_user", Leaf),
        ]))
    };

    let telegram_entry = || {
        Struct(HashMap::from([
            ("bot_token", Leaf),
            ("dm_policy", Leaf),
            ("group_requires_mention", Leaf),
            ("allowlist", Leaf),
            ("ratelimit", ratelimit()),
        ]))
    };

    let webchat = || {
        Struct(HashMap::from([("path", Leaf), ("ratelimit", ratelimit())]))
    };

    let webhook_entry = || {
        Struct(HashMap::from([("shared_secret", Leaf), ("ratelimit", ratelimit())]))
    };

    Struct(HashMap::from([
        (
            "server",
            Struct(HashMap::from([
                ("bind", Leaf),
                ("port", Leaf),
                ("http_request_logs", Leaf),
                ("behind_proxy", Leaf),
            ])),
        ),
        (
            "store",
            Struct(HashMap::from([("path", Leaf), ("busy_timeout_ms", Leaf)])),
        ),
        ("ratelimit", ratelimit()),
        (
            "pairing",
            Struct(HashMap::from([
                ("max_pending_per_channel", Leaf),
                ("code_ttl_secs", Leaf),
                ("auto_approve_local", Leaf),
                ("auto_approve_tailscale", Leaf),
                ("promote_to_owner", Leaf),
                ("reaper_interval_secs", Leaf),
            ])),
        ),
        (
            "channels",
            Struct(HashMap::from([
                ("telegram", Map(Box::new(telegram_entry()))),
                ("webchat", webchat()),
                ("webhook", Map(Box::new(webhook_entry()))),
            ])),
        ),
        (
            "hot_reload",
            Struct(HashMap::from([
                ("config_debounce_ms", Leaf),
                ("skills_debounce_ms", Leaf),
                ("skill_paths", Leaf),
            ])),
        ),
        (
            "tls",
            Struct(HashMap::from([
                ("enabled", Leaf),
                ("auto_generate", Leaf),
                ("cert_path", Leaf),
                ("key_path", Leaf),
                ("ca_cert_path", Leaf),
            ])),
        ),
        ("auth", Struct(HashMap::from([("metrics_token", Leaf)]))),
    ]))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb {
                0
            } else {
                1
            };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = if let Some(p) = path {
        Some(p.to_path_buf())
    } else {
        crate::loader::find_config_file()
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            check_file_references(&content, &mut result.diagnostics);
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without file-system side effects (useful for tests
/// and the gateway's config-watch reload path).
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult { diagnostics, config_path: None };
        },
    };

    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    match toml::from_str::<ChatgateConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult { diagnostics, config_path: None }
}

/// Walk the TOML value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                } else {
                    let level = if prefix.is_empty() {
                        "at top level "
                    } else {
                        ""
                    };
                    let suggestion = suggest(key, &known_keys, 3);
                    let msg = if let Some(s) = suggestion {
                        format!("unknown field {level}(did you mean \"{s}\"?)")
                    } else {
                        format!("unknown field {level}")
                    };
                    diagnostics.push(Diagnostic {
                        severity: Severity::Error,
                        category: "unknown-field",
                        path,
                        message: msg.trim().to_string(),
                    });
                }
            }
        },
        (toml::Value::Table(table), KnownKeys::Map(value_schema)) => {
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                check_unknown_fields(child_value, value_schema, &path, diagnostics);
            }
        },
        // Leaf or type mismatch — stop recursion (type errors caught later)
        _ => {},
    }
}

/// Run semantic checks on a successfully parsed config (§10.3: non-empty
/// bind address, positive windows/caps, wallet-address-shaped strings).
fn check_semantic_warnings(config: &ChatgateConfig, diagnostics: &mut Vec<Diagnostic>) {
    let is_localhost = config.server.bind == "127.0.0.1"
        || config.server.bind == "localhost"
        || config.server.bind == "::1";

    if config.server.bind.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "semantic",
            path: "server.bind".into(),
            message: "server.bind must not be empty".into(),
        });
    }

    if config.auth.metrics_token.is_none() && !is_localhost {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "auth.metrics_token".into(),
            message: format!(
                "no metrics bearer token set while binding to {}; /metrics is unauthenticated",
                config.server.bind
            ),
        });
    }

    if !config.tls.enabled && !is_localhost {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "tls".into(),
            message: format!("TLS is disabled while binding to {}", config.server.bind),
        });
    }

    let has_cert = config.tls.cert_path.is_some();
    let has_key = config.tls.key_path.is_some();
    if has_cert && !has_key {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "semantic",
            path: "tls".into(),
            message: "tls.cert_path is set but tls.key_path is missing".into(),
        });
    }
    if has_key && !has_cert {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "semantic",
            path: "tls".into(),
            message: "tls.key_path is set but tls.cert_path is missing".into(),
        });
    }

    if config.ratelimit.window_ms == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "semantic",
            path: "ratelimit.window_ms".into(),
            message: "ratelimit.window_ms must be greater than 0".into(),
        });
    }
    if config.ratelimit.max_requests == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "ratelimit.max_requests".into(),
            message: "ratelimit.max_requests is 0; every call will be rate-limited".into(),
        });
    }

    if config.pairing.max_pending_per_channel <= 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "semantic",
            path: "pairing.max_pending_per_channel".into(),
            message: "pairing.max_pending_per_channel must be greater than 0".into(),
        });
    }
    if config.pairing.reaper_interval_secs > 60 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "pairing.reaper_interval_secs".into(),
            message: "pairing.reaper_interval_secs exceeds the recommended 60s sweep cadence"
                .into(),
        });
    }

    for (id, telegram) in &config.channels.telegram {
        if telegram.bot_token.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "semantic",
                path: format!("channels.telegram.{id}.bot_token"),
                message: "bot_token must not be empty".into(),
            });
        }
        if let Some(rl) = &telegram.ratelimit {
            if rl.window_ms == 0 {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "semantic",
                    path: format!("channels.telegram.{id}.ratelimit.window_ms"),
                    message: "window_ms must be greater than 0".into(),
                });
            }
        }
        for (idx, user) in telegram.allowlist.iter().enumerate() {
            if user.trim().is_empty() {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    category: "semantic",
                    path: format!("channels.telegram.{id}.allowlist[{idx}]"),
                    message: "empty allowlist entry".into(),
                });
            }
        }
    }

    for (id, webhook) in &config.channels.webhook {
        if webhook.shared_secret.as_deref().is_none_or(str::is_empty) {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "semantic",
                path: format!("channels.webhook.{id}.shared_secret"),
                message: "no shared secret set; this webhook accepts unauthenticated requests"
                    .into(),
            });
        }
    }

    if config.hot_reload.config_debounce_ms == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "hot_reload.config_debounce_ms".into(),
            message: "config_debounce_ms is 0; every filesystem event triggers a reload".into(),
        });
    }

    if config.server.port == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "semantic",
            path: "server.port".into(),
            message: "port is 0; a random port will be assigned at startup".into(),
        });
    }
}

/// Wallet addresses used by pairing/copy-trading integrations look like
/// Ethereum-style hex addresses. Not a hard validation rule — informational.
#[must_use]
pub fn looks_like_wallet_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Check that file paths referenced in TLS config exist on disk.
fn check_file_references(toml_str: &str, diagnostics: &mut Vec<Diagnostic>) {
    let Ok(config) = toml::from_str::<ChatgateConfig>(toml_str) else {
        return;
    };

    let file_refs: &[(&str, &Option<String>)] = &[
        ("tls.cert_path", &config.tls.cert_path),
        ("tls.key_path", &config.tls.key_path),
        ("tls.ca_cert_path", &config.tls.ca_cert_path),
    ];

    for (path_name, value) in file_refs {
        if let Some(file_path) = value {
            let p = Path::new(file_path);
            if !p.exists() {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    category: "file-ref",
                    path: (*path_name).into(),
                    message: format!("file not found: {file_path}"),
                });
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_has_no_errors() {
        let toml_str = r#"
            [server]
            bind = "127.0.0.1"
            port = 8088

            [ratelimit]
            max_requests = 20
            window_ms = 60000
        "#;
        let result = validate_toml_str(toml_str);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn unknown_top_level_field_is_flagged() {
        let toml_str = r#"
            [servre]
            bind = "127.0.0.1"
        "#;
        let result = validate_toml_str(toml_str);
        assert!(result.has_errors());
        let d = &result.diagnostics[0];
        assert_eq!(d.category, "unknown-field");
        assert!(d.message.contains("server"));
    }

    #[test]
    fn unknown_nested_field_is_flagged() {
        let toml_str = r#"
            [server]
            bnid = "127.0.0.1"
        "#;
        let result = validate_toml_str(toml_str);
        assert!(result.diagnostics.iter().any(|d| d.path == "server.bnid"));
    }

    #[test]
    fn zero_window_ms_is_an_error() {
        let toml_str = r#"
            [ratelimit]
            window_ms = 0
        "#;
        let result = validate_toml_str(toml_str);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "ratelimit.window_ms" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn zero_max_pending_per_channel_is_an_error() {
        let toml_str = r#"
            [pairing]
            max_pending_per_channel = 0
        "#;
        let result = validate_toml_str(toml_str);
        assert!(result.has_errors());
    }

    #[test]
    fn empty_bind_address_is_an_error() {
        let toml_str = r#"
            [server]
            bind = ""
        "#;
        let result = validate_toml_str(toml_str);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "server.bind" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn empty_telegram_token_is_an_error() {
        let toml_str = r#"
            [channels.telegram.main]
            bot_token = ""
        "#;
        let result = validate_toml_str(toml_str);
        assert!(result.has_errors());
    }

    #[test]
    fn tls_cert_without_key_is_an_error() {
        let toml_str = r#"
            [tls]
            cert_path = "/tmp/cert.pem"
        "#;
        let result = validate_toml_str(toml_str);
        assert!(result.has_errors());
    }

    #[test]
    fn wallet_address_shape_check() {
        assert!(looks_like_wallet_address(
            "0x1234567890123456789012345678901234567890"
        ));
        assert!(!looks_like_wallet_address("not-a-wallet"));
        assert!(!looks_like_wallet_address("0x123"));
    }

    #[test]
    fn syntax_error_is_reported() {
        let result = validate_toml_str("this is not [ valid toml");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn suggest_finds_close_typo() {
        assert_eq!(suggest("servre", &["server", "store"], 3), Some("server"));
        assert_eq!(suggest("xyz123", &["server", "store"], 3), None);
    }
}
