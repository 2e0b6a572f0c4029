//! `channels((channelType,accountId) PK, config, createdAt, updatedAt)`
//! (§6.4). Backs [`chatgate_channels::store::ChannelStore`] — the
//! orchestrator's source of truth for which accounts to start on boot.

use anyhow::Result;
use async_trait::async_trait;
use chatgate_channels::store::{ChannelStore, StoredChannel};

use crate::Store;

#[derive(sqlx::FromRow)]
struct Row {
    account_id: String,
    channel_type: String,
    config: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<Row> for StoredChannel {
    type Error = anyhow::Error;

    fn try_from(row: Row) -> Result<Self> {
        Ok(Self {
            account_id: row.account_id,
            channel_type: row.channel_type,
            config: serde_json::from_str(&row.config)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Sqlite-backed [`ChannelStore`].
pub struct SqliteChannelStore {
    store: Store,
}

impl SqliteChannelStore {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChannelStore for SqliteChannelStore {
    async fn list(&self) -> Result<Vec<StoredChannel>> {
        let rows = sqlx::query_as::<_, Row>("SELECT * FROM channels ORDER BY channel_type, account_id")
            .fetch_all(self.store.pool())
            .await?;
        rows.into_iter().map(StoredChannel::try_from).collect()
    }

    async fn get(&self, channel_type: &str, account_id: &str) -> Result<Option<StoredChannel>> {
        let row = sqlx::query_as::<_, Row>("SELECT * FROM channels WHERE channel_type = ? AND account_id = ?")
            .bind(channel_type)
            .bind(account_id)
            .fetch_optional(self.store.pool())
            .await?;
        row.map(StoredChannel::try_from).transpose()
    }

    async fn upsert(&self, channel: StoredChannel) -> Result<()> {
        let config = serde_json::to_string(&channel.config)?;
        sqlx::query(
            r#"INSERT INTO channels (account_id, channel_type, config, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(channel_type, account_id) DO UPDATE SET
                 config = excluded.config,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&channel.account_id)
        .bind(&channel.channel_type)
        .bind(&config)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    async fn delete(&self, channel_type: &str, account_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM channels WHERE channel_type = ? AND account_id = ?")
            .bind(channel_type)
            .bind(account_id)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(account_id: &str) -> StoredChannel {
        StoredChannel {
            account_id: account_id.to_string(),
            channel_type: "telegram".to_string(),
            config: serde_json::json!({"bot_token": "abc"}),
            created_at: 100,
            updated_at: 100,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = Store::in_memory().await.unwrap();
        let channels = SqliteChannelStore::new(store);
        channels.upsert(channel("acct-1")).await.unwrap();

        let got = channels.get("telegram", "acct-1").await.unwrap().unwrap();
        assert_eq!(got.config["bot_token"], "abc");
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = Store::in_memory().await.unwrap();
        let channels = SqliteChannelStore::new(store);
        channels.upsert(channel("acct-1")).await.unwrap();
        channels.delete("telegram", "acct-1").await.unwrap();
        assert!(channels.get("telegram", "acct-1").await.unwrap().is_none());
    }
}
