//! `wallet_links((channel,chatUserId) PK, walletAddress, linkedAt,
//! linkedBy)`; index on `walletAddress` (§6.4).

use crate::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletLinkRow {
    pub channel: String,
    pub chat_user_id: String,
    pub wallet_address: String,
    pub linked_at: String,
    pub linked_by: String,
}

pub async fn upsert(pool: &sqlx::SqlitePool, row: &WalletLinkRow) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO wallet_links (channel, chat_user_id, wallet_address, linked_at, linked_by)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(channel, chat_user_id) DO UPDATE SET
             wallet_address = excluded.wallet_address,
             linked_at = excluded.linked_at,
             linked_by = excluded.linked_by"#,
    )
    .bind(&row.channel)
    .bind(&row.chat_user_id)
    .bind(&row.wallet_address)
    .bind(&row.linked_at)
    .bind(&row.linked_by)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_for_chat_user(
    pool: &sqlx::SqlitePool,
    channel: &str,
    chat_user_id: &str,
) -> Result<Option<WalletLinkRow>> {
    let row = sqlx::query_as::<_, WalletLinkRow>(
        "SELECT * FROM wallet_links WHERE channel = ? AND chat_user_id = ?",
    )
    .bind(channel)
    .bind(chat_user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_for_wallet(
    pool: &sqlx::SqlitePool,
    wallet_address: &str,
) -> Result<Vec<WalletLinkRow>> {
    let rows = sqlx::query_as::<_, WalletLinkRow>(
        "SELECT * FROM wallet_links WHERE wallet_address = ? ORDER BY linked_at ASC",
    )
    .bind(wallet_address)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete(pool: &sqlx::SqlitePool, channel: &str, chat_user_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM wallet_links WHERE channel = ? AND chat_user_id = ?")
        .bind(channel)
        .bind(chat_user_id)
        .execute(pool)
        .await?;
    Ok(())
}
