//! `chatgate db` — maintenance for the persistent store (§6.4): the
//! pairing/wallet tables plus the per-channel message log and account
//! registry, all in a single sqlite file.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum DbAction {
    /// Delete the database file completely (and any WAL/SHM siblings).
    Reset,
    /// Delete all rows but keep the schema.
    Clear,
    /// Open the database, running migrations if needed.
    Migrate,
}

pub async fn handle_db(action: DbAction) -> anyhow::Result<()> {
    match action {
        DbAction::Reset => reset().await,
        DbAction::Clear => clear().await,
        DbAction::Migrate => migrate().await,
    }
}

fn db_path() -> std::path::PathBuf {
    let config = chatgate_config::discover_and_load();
    std::path::PathBuf::from(config.store.path)
}

async fn reset() -> anyhow::Result<()> {
    let path = db_path();
    let mut deleted = false;
    for suffix in ["", "-wal", "-shm"] {
        let candidate = if suffix.is_empty() { path.clone() } else { path.with_extension(format!("db{suffix}")) };
        if candidate.exists() {
            std::fs::remove_file(&candidate)?;
            println!("Deleted: {}", candidate.display());
            deleted = true;
        }
    }
    if deleted {
        println!("Database deleted. Run `chatgate db migrate` to recreate it.");
    } else {
        println!("No database file found at {}.", path.display());
    }
    Ok(())
}

async fn clear() -> anyhow::Result<()> {
    let path = db_path();
    if !path.exists() {
        println!("No database file found at {}.", path.display());
        return Ok(());
    }

    let store = chatgate_store::Store::open(&path).await?;
    // Children before parents: wallet_links references wallet_pairing_codes
    // only by value (no FK), but clearing in dependency order keeps the
    // intent obvious for future schema additions that do add one.
    for table in ["wallet_links", "wallet_pairing_codes", "paired_users", "pairing_requests", "message_log", "channels"] {
        let query = format!("DELETE FROM {table}");
        match sqlx::query(&query).execute(store.pool()).await {
            Ok(_) => println!("Cleared table: {table}"),
            Err(err) => eprintln!("Warning: could not clear {table}: {err}"),
        }
    }
    println!("Database cleared.");
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let path = db_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    chatgate_store::Store::open(&path).await?;
    println!("Migrations complete: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_then_reset_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("chatgate.db");
        chatgate_store::Store::open(&db).await.unwrap();
        assert!(db.exists());
        std::fs::remove_file(&db).unwrap();
        assert!(!db.exists());
    }
}
