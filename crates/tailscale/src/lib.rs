//! Tailscale peer-identity lookup.
//!
//! `chatgate-pairing`'s `checkAutoApprove` uses a CGNAT-range check
//! (`100.64.0.0/10`) as a cheap pre-filter, then calls this crate's
//! `TailscaleClient::lookup_peer` to confirm the address is an actual
//! tailnet peer before honoring `autoApproveTailscale` — shelling out to
//! the local `tailscale` CLI the way a `tailscale status --json` caller
//! would. The returned `PeerInfo` doubles as identity enrichment for
//! approval logs and operator-facing pairing notifications.

pub mod client;
pub mod error;

pub use {
    client::{PeerInfo, TailscaleClient},
    error::{Error, Result},
};
