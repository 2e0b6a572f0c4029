//! `pairing_requests(code PK, channel, userId, username?, createdAt,
//! expiresAt)`; index on `channel` (§6.4).

use crate::{Result, timestamp};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PairingRequestRow {
    pub code: String,
    pub channel: String,
    pub user_id: String,
    pub username: Option<String>,
    pub created_at: String,
    pub expires_at: String,
}

pub async fn insert(pool: &sqlx::SqlitePool, row: &PairingRequestRow) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO pairing_requests (code, channel, user_id, username, created_at, expires_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(code) DO UPDATE SET
             channel = excluded.channel,
             user_id = excluded.user_id,
             username = excluded.username,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at"#,
    )
    .bind(&row.code)
    .bind(&row.channel)
    .bind(&row.user_id)
    .bind(&row.username)
    .bind(&row.created_at)
    .bind(&row.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_code(pool: &sqlx::SqlitePool, code: &str) -> Result<Option<PairingRequestRow>> {
    let row = sqlx::query_as::<_, PairingRequestRow>("SELECT * FROM pairing_requests WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// The live (unexpired) request for `(channel, user_id)`, if any. Per I3
/// there is at most one at a time, but a stale expired row can still be
/// sitting in the table if the reaper hasn't swept it yet; the caller is
/// expected to delete it when it observes expiry (see `validate_code`).
pub async fn get_for_user(
    pool: &sqlx::SqlitePool,
    channel: &str,
    user_id: &str,
) -> Result<Option<PairingRequestRow>> {
    let row = sqlx::query_as::<_, PairingRequestRow>(
        "SELECT * FROM pairing_requests WHERE channel = ? AND user_id = ?",
    )
    .bind(channel)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn count_for_channel(pool: &sqlx::SqlitePool, channel: &str) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pairing_requests WHERE channel = ?")
            .bind(channel)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn delete_by_code(pool: &sqlx::SqlitePool, code: &str) -> Result<()> {
    sqlx::query("DELETE FROM pairing_requests WHERE code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete every request whose `expires_at` is in the past. Used by both the
/// periodic reaper and opportunistically by read paths that notice expiry.
pub async fn delete_expired(pool: &sqlx::SqlitePool) -> Result<u64> {
    let now = timestamp::now();
    let result = sqlx::query("DELETE FROM pairing_requests WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn code_exists(pool: &sqlx::SqlitePool, code: &str) -> Result<bool> {
    Ok(get_by_code(pool, code).await?.is_some())
}
