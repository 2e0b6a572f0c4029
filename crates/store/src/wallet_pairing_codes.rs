//! `wallet_pairing_codes(code PK, walletAddress, createdAt, expiresAt)`
//! (§6.4). Consumed at most once — see [`crate::wallet_links::upsert`] and
//! `chatgate-pairing`'s `validate_wallet_pairing_code`.

use crate::{Result, timestamp};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletPairingCodeRow {
    pub code: String,
    pub wallet_address: String,
    pub created_at: String,
    pub expires_at: String,
}

pub async fn insert(pool: &sqlx::SqlitePool, row: &WalletPairingCodeRow) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO wallet_pairing_codes (code, wallet_address, created_at, expires_at)
           VALUES (?, ?, ?, ?)
           ON CONFLICT(code) DO UPDATE SET
             wallet_address = excluded.wallet_address,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at"#,
    )
    .bind(&row.code)
    .bind(&row.wallet_address)
    .bind(&row.created_at)
    .bind(&row.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_code(
    pool: &sqlx::SqlitePool,
    code: &str,
) -> Result<Option<WalletPairingCodeRow>> {
    let row =
        sqlx::query_as::<_, WalletPairingCodeRow>("SELECT * FROM wallet_pairing_codes WHERE code = ?")
            .bind(code)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub async fn delete_by_code(pool: &sqlx::SqlitePool, code: &str) -> Result<()> {
    sqlx::query("DELETE FROM wallet_pairing_codes WHERE code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_expired(pool: &sqlx::SqlitePool) -> Result<u64> {
    let now = timestamp::now();
    let result = sqlx::query("DELETE FROM wallet_pairing_codes WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn code_exists(pool: &sqlx::SqlitePool, code: &str) -> Result<bool> {
    Ok(get_by_code(pool, code).await?.is_some())
}
