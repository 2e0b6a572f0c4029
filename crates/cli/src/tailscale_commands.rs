//! `chatgate tailscale status` — operator-facing wrapper around
//! [`chatgate_tailscale::TailscaleClient`], the same peer-identity lookup
//! the pairing service's `checkAutoApprove` (§4.2) consults once a remote
//! address has already been classified as tailnet-local.

use std::net::IpAddr;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum TailscaleAction {
    /// Look up the tailnet peer identity for an address.
    Status {
        /// Remote address to resolve.
        address: IpAddr,
    },
}

pub async fn handle_tailscale(action: TailscaleAction) -> anyhow::Result<()> {
    match action {
        TailscaleAction::Status { address } => status(address).await,
    }
}

async fn status(address: IpAddr) -> anyhow::Result<()> {
    let client = chatgate_tailscale::TailscaleClient::new();
    match client.lookup_peer(address).await? {
        Some(peer) => {
            println!("hostname:   {}", peer.hostname);
            println!("login:      {}", peer.login_name.unwrap_or_else(|| "-".into()));
            println!("tailnet:    {}", peer.tailnet.unwrap_or_else(|| "-".into()));
        },
        None => println!("no tailnet peer found for {address} (is `tailscale` installed and logged in?)"),
    }
    Ok(())
}
