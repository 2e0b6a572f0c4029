//! `paired_users((channel,userId) PK, username?, pairedAt, pairedBy,
//! isOwner)`; index on `channel` (§6.4).

use crate::Result;

/// Mirrors the spec's `pairedBy ∈ {code, allowlist, auto, owner}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairedBy {
    Code,
    Allowlist,
    Auto,
    Owner,
}

impl PairedBy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Allowlist => "allowlist",
            Self::Auto => "auto",
            Self::Owner => "owner",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(Self::Code),
            "allowlist" => Some(Self::Allowlist),
            "auto" => Some(Self::Auto),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PairedUserRow {
    pub channel: String,
    pub user_id: String,
    pub username: Option<String>,
    pub paired_at: String,
    pub paired_by: String,
    pub is_owner: i64,
}

impl PairedUserRow {
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.is_owner != 0
    }
}

pub async fn upsert(pool: &sqlx::SqlitePool, row: &PairedUserRow) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO paired_users (channel, user_id, username, paired_at, paired_by, is_owner)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(channel, user_id) DO UPDATE SET
             username = excluded.username,
             paired_at = excluded.paired_at,
             paired_by = excluded.paired_by,
             is_owner = excluded.is_owner"#,
    )
    .bind(&row.channel)
    .bind(&row.user_id)
    .bind(&row.username)
    .bind(&row.paired_at)
    .bind(&row.paired_by)
    .bind(row.is_owner)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &sqlx::SqlitePool, channel: &str, user_id: &str) -> Result<Option<PairedUserRow>> {
    let row = sqlx::query_as::<_, PairedUserRow>(
        "SELECT * FROM paired_users WHERE channel = ? AND user_id = ?",
    )
    .bind(channel)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &sqlx::SqlitePool, channel: &str, user_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM paired_users WHERE channel = ? AND user_id = ?")
        .bind(channel)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_for_channel(pool: &sqlx::SqlitePool, channel: &str) -> Result<Vec<PairedUserRow>> {
    let rows = sqlx::query_as::<_, PairedUserRow>(
        "SELECT * FROM paired_users WHERE channel = ? ORDER BY paired_at ASC",
    )
    .bind(channel)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
