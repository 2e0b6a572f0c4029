use std::path::Path;

use crate::Result;

/// Owns the single sqlite pool shared by the pairing/wallet tables. The
/// orchestrator opens one of these at boot (§4.4 step 1) before
/// constructing anything downstream.
#[derive(Clone)]
pub struct Store {
    pool: sqlx::SqlitePool,
}

impl Store {
    /// Open (creating if absent) the sqlite database at `path` and run
    /// migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = sqlx::SqlitePool::connect(&db_url).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// An ephemeral in-memory store, for tests and for `:memory:` config.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    async fn migrate(pool: &sqlx::SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS pairing_requests (
                code       TEXT PRIMARY KEY,
                channel    TEXT NOT NULL,
                user_id    TEXT NOT NULL,
                username   TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pairing_requests_channel ON pairing_requests(channel)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS paired_users (
                channel    TEXT NOT NULL,
                user_id    TEXT NOT NULL,
                username   TEXT,
                paired_at  TEXT NOT NULL,
                paired_by  TEXT NOT NULL,
                is_owner   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (channel, user_id)
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_paired_users_channel ON paired_users(channel)")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS wallet_pairing_codes (
                code           TEXT PRIMARY KEY,
                wallet_address TEXT NOT NULL,
                created_at     TEXT NOT NULL,
                expires_at     TEXT NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS wallet_links (
                channel        TEXT NOT NULL,
                chat_user_id   TEXT NOT NULL,
                wallet_address TEXT NOT NULL,
                linked_at      TEXT NOT NULL,
                linked_by      TEXT NOT NULL,
                PRIMARY KEY (channel, chat_user_id)
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_wallet_links_wallet ON wallet_links(wallet_address)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS message_log (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id     TEXT NOT NULL,
                channel_type   TEXT NOT NULL,
                peer_id        TEXT NOT NULL,
                username       TEXT,
                sender_name    TEXT,
                chat_id        TEXT NOT NULL,
                chat_type      TEXT NOT NULL,
                body           TEXT NOT NULL,
                access_granted INTEGER NOT NULL,
                created_at     INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_message_log_account ON message_log(account_id, created_at)",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channels (
                account_id   TEXT NOT NULL,
                channel_type TEXT NOT NULL,
                config       TEXT NOT NULL,
                created_at   INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL,
                PRIMARY KEY (channel_type, account_id)
            )"#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        Store::migrate(store.pool()).await.unwrap();
        Store::migrate(store.pool()).await.unwrap();
    }
}
