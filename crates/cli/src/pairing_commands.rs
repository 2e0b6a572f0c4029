//! `chatgate pairing` — operator-facing wrapper around
//! [`chatgate_pairing::PairingService`] (§4.2) for approving/rejecting
//! codes and listing paired users out of band, without going through a
//! chat channel.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum PairingAction {
    /// Approve a pending pairing code for a channel.
    Approve { channel: String, code: String },
    /// Reject (consume without pairing) a pending code for a channel.
    Reject { channel: String, code: String },
    /// List paired users for a channel.
    List { channel: String },
}

pub async fn handle_pairing(action: PairingAction) -> anyhow::Result<()> {
    let config = chatgate_config::discover_and_load();
    let store = chatgate_store::Store::open(std::path::Path::new(&config.store.path)).await?;
    let service = chatgate_pairing::PairingService::new(store.clone());

    match action {
        PairingAction::Approve { channel, code } => {
            let request = service.approve_request(&channel, &code).await?;
            println!("Approved {} for channel {channel} (user {})", request.code, request.user_id);
        },
        PairingAction::Reject { channel, code } => {
            service.reject_request(&channel, &code).await?;
            println!("Rejected code {code} for channel {channel}");
        },
        PairingAction::List { channel } => {
            let rows = chatgate_store::paired_users::list_for_channel(store.pool(), &channel).await?;
            if rows.is_empty() {
                println!("No paired users for channel {channel}.");
            } else {
                for row in rows {
                    let owner = if row.is_owner() { " (owner)" } else { "" };
                    println!("{}{owner} — paired via {:?} at {}", row.user_id, row.paired_by, row.paired_at);
                }
            }
        },
    }

    Ok(())
}
