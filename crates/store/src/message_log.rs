//! `message_log(id PK, accountId, channelType, peerId, username?,
//! senderName?, chatId, chatType, body, accessGranted, createdAt)`; index
//! on `(accountId, createdAt)` (§6.4). Backs [`chatgate_channels::message_log::MessageLog`].

use async_trait::async_trait;
use chatgate_channels::{
    error::Result,
    message_log::{MessageLog, MessageLogEntry, SenderSummary},
};

use crate::Store;

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    account_id: String,
    channel_type: String,
    peer_id: String,
    username: Option<String>,
    sender_name: Option<String>,
    chat_id: String,
    chat_type: String,
    body: String,
    access_granted: i64,
    created_at: i64,
}

impl From<Row> for MessageLogEntry {
    fn from(row: Row) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            channel_type: row.channel_type,
            peer_id: row.peer_id,
            username: row.username,
            sender_name: row.sender_name,
            chat_id: row.chat_id,
            chat_type: row.chat_type,
            body: row.body,
            access_granted: row.access_granted != 0,
            created_at: row.created_at,
        }
    }
}

/// Sqlite-backed [`MessageLog`], sharing the pairing/wallet pool (§9
/// "ownership of long-lived state").
pub struct SqliteMessageLog {
    store: Store,
}

impl SqliteMessageLog {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageLog for SqliteMessageLog {
    async fn log(&self, entry: MessageLogEntry) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO message_log
                 (account_id, channel_type, peer_id, username, sender_name, chat_id, chat_type, body, access_granted, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&entry.account_id)
        .bind(&entry.channel_type)
        .bind(&entry.peer_id)
        .bind(&entry.username)
        .bind(&entry.sender_name)
        .bind(&entry.chat_id)
        .bind(&entry.chat_type)
        .bind(&entry.body)
        .bind(entry.access_granted as i64)
        .bind(entry.created_at)
        .execute(self.store.pool())
        .await
        .map_err(|e| chatgate_channels::error::Error::external("message_log insert", e))?;
        Ok(())
    }

    async fn list_by_account(&self, account_id: &str, limit: u32) -> Result<Vec<MessageLogEntry>> {
        let rows = sqlx::query_as::<_, Row>(
            "SELECT * FROM message_log WHERE account_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(account_id)
        .bind(i64::from(limit))
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| chatgate_channels::error::Error::external("message_log list", e))?;
        Ok(rows.into_iter().map(MessageLogEntry::from).collect())
    }

    async fn unique_senders(&self, account_id: &str) -> Result<Vec<SenderSummary>> {
        #[derive(sqlx::FromRow)]
        struct SenderRow {
            peer_id: String,
            username: Option<String>,
            sender_name: Option<String>,
            message_count: i64,
            last_seen: i64,
            last_access_granted: i64,
        }

        let rows = sqlx::query_as::<_, SenderRow>(
            r#"SELECT
                 peer_id,
                 username,
                 sender_name,
                 COUNT(*) AS message_count,
                 MAX(created_at) AS last_seen,
                 (SELECT access_granted FROM message_log m2
                    WHERE m2.account_id = m1.account_id AND m2.peer_id = m1.peer_id
                    ORDER BY m2.created_at DESC LIMIT 1) AS last_access_granted
               FROM message_log m1
               WHERE account_id = ?
               GROUP BY peer_id
               ORDER BY last_seen DESC"#,
        )
        .bind(account_id)
        .fetch_all(self.store.pool())
        .await
        .map_err(|e| chatgate_channels::error::Error::external("message_log unique_senders", e))?;

        Ok(rows
            .into_iter()
            .map(|r| SenderSummary {
                peer_id: r.peer_id,
                username: r.username,
                sender_name: r.sender_name,
                message_count: r.message_count,
                last_seen: r.last_seen,
                last_access_granted: r.last_access_granted != 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account_id: &str, peer_id: &str, created_at: i64) -> MessageLogEntry {
        MessageLogEntry {
            id: 0,
            account_id: account_id.to_string(),
            channel_type: "telegram".to_string(),
            peer_id: peer_id.to_string(),
            username: None,
            sender_name: None,
            chat_id: peer_id.to_string(),
            chat_type: "dm".to_string(),
            body: "hi".to_string(),
            access_granted: true,
            created_at,
        }
    }

    #[tokio::test]
    async fn logs_and_lists_by_account() {
        let store = Store::in_memory().await.unwrap();
        let log = SqliteMessageLog::new(store);
        log.log(entry("acct-1", "user-1", 100)).await.unwrap();
        log.log(entry("acct-1", "user-2", 200)).await.unwrap();
        log.log(entry("acct-2", "user-3", 300)).await.unwrap();

        let rows = log.list_by_account("acct-1", 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].peer_id, "user-2");
    }

    #[tokio::test]
    async fn unique_senders_aggregates_per_peer() {
        let store = Store::in_memory().await.unwrap();
        let log = SqliteMessageLog::new(store);
        log.log(entry("acct-1", "user-1", 100)).await.unwrap();
        log.log(entry("acct-1", "user-1", 200)).await.unwrap();

        let senders = log.unique_senders("acct-1").await.unwrap();
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].message_count, 2);
    }
}
