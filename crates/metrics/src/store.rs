//! Metrics history storage.
//!
//! This module provides a trait-based abstraction for persisting metrics history
//! to enable historical charts that survive restarts.

use {
    anyhow::Result,
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, path::Path},
};

/// Per-channel message metrics for a single time point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelCounts {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub errors: u64,
}

/// A historical metrics data point for time-series charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsHistoryPoint {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Pairing requests created (aggregate).
    pub pairing_requests_created: u64,
    /// Pairing codes validated (aggregate).
    pub pairing_codes_validated: u64,
    /// Menu callback dispatches (aggregate).
    pub menu_callbacks: u64,
    /// Menu dispatch errors.
    pub menu_errors: u64,
    /// Per-channel message breakdown.
    #[serde(default)]
    pub by_channel: HashMap<String, ChannelCounts>,
    /// HTTP requests total.
    pub http_requests: u64,
    /// Active HTTP requests (in-flight).
    pub http_active: u64,
    /// WebSocket connections total.
    pub ws_connections: u64,
    /// Active WebSocket connections.
    pub ws_active: u64,
    /// Rate-limiter rejections.
    pub ratelimit_rejections: u64,
    /// Active menu sessions.
    pub active_sessions: u64,
}

/// Trait for metrics history storage backends.
#[async_trait::async_trait]
pub trait MetricsStore: Send + Sync {
    /// Save a new metrics data point.
    async fn save_point(&self, point: &MetricsHistoryPoint) -> Result<()>;

    /// Load metrics history since a given timestamp (millis).
    ///
    /// Returns points ordered by timestamp ascending.
    /// If `since` is 0, returns all points up to `limit`.
    async fn load_history(&self, since: u64, limit: usize) -> Result<Vec<MetricsHistoryPoint>>;

    /// Delete metrics older than the given timestamp (millis).
    ///
    /// Returns the number of deleted rows.
    async fn cleanup_before(&self, before: u64) -> Result<u64>;

    /// Get the most recent data point, if any.
    async fn latest_point(&self) -> Result<Option<MetricsHistoryPoint>>;
}

/// SQLite-based metrics store.
pub struct SqliteMetricsStore {
    pool: sqlx::SqlitePool,
}

impl SqliteMetricsStore {
    /// Create a new SQLite metrics store. Opens or creates the database at the given path.
    pub async fn new(path: &Path) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = sqlx::SqlitePool::connect(&db_url).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Create an in-memory SQLite metrics store (for testing).
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &sqlx::SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metrics_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                pairing_requests_created INTEGER NOT NULL DEFAULT 0,
                pairing_codes_validated INTEGER NOT NULL DEFAULT 0,
                menu_callbacks INTEGER NOT NULL DEFAULT 0,
                menu_errors INTEGER NOT NULL DEFAULT 0,
                by_channel TEXT,
                http_requests INTEGER NOT NULL DEFAULT 0,
                http_active INTEGER NOT NULL DEFAULT 0,
                ws_connections INTEGER NOT NULL DEFAULT 0,
                ws_active INTEGER NOT NULL DEFAULT 0,
                ratelimit_rejections INTEGER NOT NULL DEFAULT 0,
                active_sessions INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_metrics_history_timestamp
            ON metrics_history(timestamp)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn save_point(&self, point: &MetricsHistoryPoint) -> Result<()> {
        let by_channel_json = if point.by_channel.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&point.by_channel)?)
        };

        sqlx::query(
            r#"
            INSERT INTO metrics_history (
                timestamp, pairing_requests_created, pairing_codes_validated, menu_callbacks,
                menu_errors, by_channel, http_requests, http_active, ws_connections,
                ws_active, ratelimit_rejections, active_sessions
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(point.timestamp as i64)
        .bind(point.pairing_requests_created as i64)
        .bind(point.pairing_codes_validated as i64)
        .bind(point.menu_callbacks as i64)
        .bind(point.menu_errors as i64)
        .bind(by_channel_json)
        .bind(point.http_requests as i64)
        .bind(point.http_active as i64)
        .bind(point.ws_connections as i64)
        .bind(point.ws_active as i64)
        .bind(point.ratelimit_rejections as i64)
        .bind(point.active_sessions as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_history(&self, since: u64, limit: usize) -> Result<Vec<MetricsHistoryPoint>> {
        let rows = sqlx::query_as::<_, MetricsRow>(
            r#"
            SELECT timestamp, pairing_requests_created, pairing_codes_validated, menu_callbacks,
                   menu_errors, by_channel, http_requests, http_active, ws_connections,
                   ws_active, ratelimit_rejections, active_sessions
            FROM metrics_history
            WHERE timestamp >= ?
            ORDER BY timestamp ASC
            LIMIT ?
            "#,
        )
        .bind(since as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn cleanup_before(&self, before: u64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM metrics_history WHERE timestamp < ?")
            .bind(before as i64)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn latest_point(&self) -> Result<Option<MetricsHistoryPoint>> {
        let row = sqlx::query_as::<_, MetricsRow>(
            r#"
            SELECT timestamp, pairing_requests_created, pairing_codes_validated, menu_callbacks,
                   menu_errors, by_channel, http_requests, http_active, ws_connections,
                   ws_active, ratelimit_rejections, active_sessions
            FROM metrics_history
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct MetricsRow {
    timestamp: i64,
    pairing_requests_created: i64,
    pairing_codes_validated: i64,
    menu_callbacks: i64,
    menu_errors: i64,
    by_channel: Option<String>,
    http_requests: i64,
    http_active: i64,
    ws_connections: i64,
    ws_active: i64,
    ratelimit_rejections: i64,
    active_sessions: i64,
}

impl From<MetricsRow> for MetricsHistoryPoint {
    fn from(row: MetricsRow) -> Self {
        let by_channel = row
            .by_channel
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Self {
            timestamp: row.timestamp as u64,
            pairing_requests_created: row.pairing_requests_created as u64,
            pairing_codes_validated: row.pairing_codes_validated as u64,
            menu_callbacks: row.menu_callbacks as u64,
            menu_errors: row.menu_errors as u64,
            by_channel,
            http_requests: row.http_requests as u64,
            http_active: row.http_active as u64,
            ws_connections: row.ws_connections as u64,
            ws_active: row.ws_active as u64,
            ratelimit_rejections: row.ratelimit_rejections as u64,
            active_sessions: row.active_sessions as u64,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn make_point(timestamp: u64, menu_callbacks: u64) -> MetricsHistoryPoint {
        MetricsHistoryPoint {
            timestamp,
            pairing_requests_created: 0,
            pairing_codes_validated: 0,
            menu_callbacks,
            menu_errors: 0,
            by_channel: HashMap::new(),
            http_requests: 0,
            http_active: 0,
            ws_connections: 0,
            ws_active: 0,
            ratelimit_rejections: 0,
            active_sessions: 0,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = SqliteMetricsStore::in_memory().await.unwrap();

        let mut point = make_point(1000, 10);
        point.pairing_requests_created = 3;
        point.http_requests = 200;
        point.http_active = 5;
        point.ws_connections = 20;
        point.ws_active = 3;
        point.ratelimit_rejections = 2;
        point.active_sessions = 4;

        store.save_point(&point).await.unwrap();

        let history = store.load_history(0, 100).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, 1000);
        assert_eq!(history[0].menu_callbacks, 10);
        assert_eq!(history[0].pairing_requests_created, 3);
    }

    #[tokio::test]
    async fn test_save_and_load_with_channel() {
        let store = SqliteMetricsStore::in_memory().await.unwrap();

        let mut point = make_point(1000, 10);
        point.by_channel.insert("telegram".to_string(), ChannelCounts {
            messages_received: 500,
            messages_sent: 200,
            errors: 5,
        });
        point.by_channel.insert("webchat".to_string(), ChannelCounts {
            messages_received: 300,
            messages_sent: 100,
            errors: 1,
        });

        store.save_point(&point).await.unwrap();

        let history = store.load_history(0, 100).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].by_channel.len(), 2);
        assert_eq!(history[0].by_channel["telegram"].messages_received, 500);
        assert_eq!(history[0].by_channel["webchat"].errors, 1);
    }

    #[tokio::test]
    async fn test_load_since() {
        let store = SqliteMetricsStore::in_memory().await.unwrap();

        for i in 0..5 {
            store
                .save_point(&make_point(1000 + i * 100, i))
                .await
                .unwrap();
        }

        let history = store.load_history(1200, 100).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].timestamp, 1200);
    }

    #[tokio::test]
    async fn test_cleanup() {
        let store = SqliteMetricsStore::in_memory().await.unwrap();

        for i in 0..5 {
            store
                .save_point(&make_point(1000 + i * 100, 0))
                .await
                .unwrap();
        }

        let deleted = store.cleanup_before(1200).await.unwrap();
        assert_eq!(deleted, 2);

        let history = store.load_history(0, 100).await.unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_latest_point() {
        let store = SqliteMetricsStore::in_memory().await.unwrap();

        assert!(store.latest_point().await.unwrap().is_none());

        for i in 0..3 {
            store
                .save_point(&make_point(1000 + i * 100, i))
                .await
                .unwrap();
        }

        let latest = store.latest_point().await.unwrap().unwrap();
        assert_eq!(latest.timestamp, 1200);
        assert_eq!(latest.menu_callbacks, 2);
    }
}
