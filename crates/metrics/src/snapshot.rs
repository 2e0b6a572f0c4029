//! Metrics snapshot for internal API consumption.
//!
//! This module provides a way to get metrics data as structured JSON
//! for display in the `/health?deep=true` and internal diagnostics surface,
//! separate from the Prometheus text format served at `/metrics`.

use {
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Type of metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

/// A single metric value with its labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// The metric name
    pub name: String,
    /// The metric type
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    /// Labels attached to this metric
    pub labels: HashMap<String, String>,
    /// The current value (for counters and gauges)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Histogram data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramSnapshot>,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Histogram bucket and summary data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    pub buckets: Vec<HistogramBucket>,
    pub percentiles: PercentilesSnapshot,
}

/// A single histogram bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Upper bound of this bucket (exclusive, except +Inf)
    pub le: f64,
    /// Cumulative count of observations <= le
    pub count: u64,
}

/// Pre-calculated percentiles for histograms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentilesSnapshot {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// A complete snapshot of all metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Timestamp when the snapshot was taken (Unix millis)
    pub timestamp: u64,
    /// All metric values
    pub metrics: Vec<MetricSnapshot>,
    /// Metrics grouped by category
    pub categories: MetricCategories,
}

/// Metrics organized by category for easier UI consumption
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricCategories {
    pub http: CategoryMetrics,
    pub websocket: CategoryMetrics,
    pub channels: CategoryMetrics,
    pub ratelimit: CategoryMetrics,
    pub pairing: CategoryMetrics,
    pub menu: CategoryMetrics,
    pub system: SystemMetrics,
}

/// Generic category metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryMetrics {
    /// Total requests/operations
    pub total: u64,
    /// Error count
    pub errors: u64,
    /// Currently active/in-flight
    pub active: u64,
    /// Average duration in seconds
    pub avg_duration_seconds: Option<f64>,
    /// P99 duration in seconds
    pub p99_duration_seconds: Option<f64>,
}

/// System-level metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Uptime in seconds
    pub uptime_seconds: f64,
    /// Number of connected clients
    pub connected_clients: u64,
    /// Active menu sessions
    pub active_sessions: u64,
    /// Build version
    pub version: Option<String>,
}

impl MetricsSnapshot {
    /// Create a new empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            metrics: Vec::new(),
            categories: MetricCategories::default(),
        }
    }

    /// Parse Prometheus text format into a structured snapshot.
    ///
    /// This is a best-effort parser that extracts metric values from
    /// Prometheus exposition format.
    #[must_use]
    pub fn from_prometheus_text(text: &str) -> Self {
        let mut snapshot = Self::new();

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(metric) = parse_prometheus_line(line) {
                update_categories(&mut snapshot.categories, &metric);
                snapshot.metrics.push(metric);
            }
        }

        snapshot
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a single Prometheus metric line
fn parse_prometheus_line(line: &str) -> Option<MetricSnapshot> {
    // Format: metric_name{label1="value1",label2="value2"} value
    // or: metric_name value

    let (name_and_labels, value_str) = line.rsplit_once(' ')?;
    let value: f64 = value_str.parse().ok()?;

    let (name, labels) = if let Some(brace_start) = name_and_labels.find('{') {
        let name = &name_and_labels[..brace_start];
        let labels_str = name_and_labels
            .get(brace_start + 1..name_and_labels.len() - 1)
            .unwrap_or("");
        let labels = parse_labels(labels_str);
        (name, labels)
    } else {
        (name_and_labels, HashMap::new())
    };

    let metric_type = if name.ends_with("_total") || name.ends_with("_count") {
        MetricType::Counter
    } else if name.ends_with("_bucket") || name.ends_with("_sum") {
        return None;
    } else {
        MetricType::Gauge
    };

    Some(MetricSnapshot {
        name: name.to_string(),
        metric_type,
        labels,
        value: Some(value),
        histogram: None,
        description: None,
    })
}

/// Parse Prometheus label format: key1="value1",key2="value2"
fn parse_labels(labels_str: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();

    if labels_str.is_empty() {
        return labels;
    }

    // Simple parser - doesn't handle escaped quotes in values
    for part in labels_str.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim_matches('"');
            labels.insert(key.to_string(), value.to_string());
        }
    }

    labels
}

/// Update category aggregates based on a metric
fn update_categories(categories: &mut MetricCategories, metric: &MetricSnapshot) {
    let name = &metric.name;
    let value = metric.value.unwrap_or(0.0) as u64;

    if name.starts_with("chatgate_http_requests_total") {
        categories.http.total += value;
    } else if name.starts_with("chatgate_http_requests_in_flight") {
        categories.http.active = value;
    } else if name.starts_with("chatgate_websocket_connections_total") {
        categories.websocket.total += value;
    } else if name.starts_with("chatgate_websocket_connections_active") {
        categories.websocket.active = value;
    } else if name.starts_with("chatgate_channel_messages_received_total") {
        categories.channels.total += value;
    } else if name.starts_with("chatgate_channel_errors_total") {
        categories.channels.errors += value;
    } else if name.starts_with("chatgate_channels_active") {
        categories.channels.active = value;
    } else if name.starts_with("chatgate_ratelimit_checks_total") {
        categories.ratelimit.total += value;
    } else if name.starts_with("chatgate_ratelimit_rejections_total") {
        categories.ratelimit.errors += value;
    } else if name.starts_with("chatgate_ratelimit_buckets_active") {
        categories.ratelimit.active = value;
    } else if name.starts_with("chatgate_pairing_requests_created_total") {
        categories.pairing.total += value;
    } else if name.starts_with("chatgate_pairing_codes_expired_total") {
        categories.pairing.errors += value;
    } else if name.starts_with("chatgate_menu_callbacks_total") {
        categories.menu.total += value;
    } else if name.starts_with("chatgate_menu_dispatch_errors_total") {
        categories.menu.errors += value;
    } else if name.starts_with("chatgate_menu_active_sessions") {
        categories.menu.active = value;
        categories.system.active_sessions = value;
    } else if name.starts_with("chatgate_uptime_seconds") {
        categories.system.uptime_seconds = metric.value.unwrap_or(0.0);
    } else if name.starts_with("chatgate_connected_clients") {
        categories.system.connected_clients = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prometheus_line_simple() {
        let metric = parse_prometheus_line("chatgate_http_requests_total 42").unwrap();
        assert_eq!(metric.name, "chatgate_http_requests_total");
        assert_eq!(metric.value, Some(42.0));
        assert!(metric.labels.is_empty());
    }

    #[test]
    fn test_parse_prometheus_line_with_labels() {
        let metric =
            parse_prometheus_line(r#"chatgate_http_requests_total{method="GET",status="200"} 100"#)
                .unwrap();
        assert_eq!(metric.name, "chatgate_http_requests_total");
        assert_eq!(metric.value, Some(100.0));
        assert_eq!(metric.labels.get("method"), Some(&"GET".to_string()));
        assert_eq!(metric.labels.get("status"), Some(&"200".to_string()));
    }

    #[test]
    fn test_snapshot_from_prometheus_text() {
        let text = r#"
# HELP chatgate_http_requests_total Total HTTP requests
# TYPE chatgate_http_requests_total counter
chatgate_http_requests_total{method="GET"} 100
chatgate_http_requests_total{method="POST"} 50
chatgate_pairing_requests_created_total{channel="telegram"} 25
"#;

        let snapshot = MetricsSnapshot::from_prometheus_text(text);
        assert_eq!(snapshot.metrics.len(), 3);
        assert_eq!(snapshot.categories.http.total, 150);
        assert_eq!(snapshot.categories.pairing.total, 25);
    }
}
