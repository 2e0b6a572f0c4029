//! Shells out to `tailscale status --json` and matches a remote address
//! against the tailnet's peer map. `chatgate-pairing` calls `lookup_peer`
//! to confirm tailnet membership before honoring `autoApproveTailscale` —
//! the CGNAT-range check in `chatgate-pairing::locality` is only a
//! pre-filter, not the trust boundary.

use std::{net::IpAddr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity information for a tailnet peer, surfaced alongside a
/// `checkAutoApprove` `Tailscale` decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub hostname: String,
    pub login_name: Option<String>,
    pub tailnet: Option<String>,
}

/// Thin wrapper around the `tailscale` CLI binary.
#[derive(Debug, Clone, Default)]
pub struct TailscaleClient;

impl TailscaleClient {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Find the tailnet peer whose `TailscaleIPs` contains `addr`, if the
    /// `tailscale` CLI is installed and logged in. Returns `Ok(None)` for
    /// any failure mode short of a successful lookup — enrichment is
    /// best-effort and never blocks pairing on tailscale being available.
    pub async fn lookup_peer(&self, addr: IpAddr) -> Result<Option<PeerInfo>> {
        let status = self.status_json().await?;

        let tailnet =
            status.pointer("/CurrentTailnet/Name").and_then(|v| v.as_str()).map(String::from);

        if let Some(info) = peer_matching(&status, "/Self", addr, &tailnet) {
            return Ok(Some(info));
        }

        let Some(peers) = status.pointer("/Peer").and_then(|v| v.as_object()) else {
            return Ok(None);
        };
        for key in peers.keys() {
            let pointer = format!("/Peer/{key}");
            if let Some(info) = peer_matching(&status, &pointer, addr, &tailnet) {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }

    async fn status_json(&self) -> Result<serde_json::Value> {
        let output = tokio::time::timeout(
            STATUS_TIMEOUT,
            tokio::process::Command::new("tailscale")
                .args(["status", "--json"])
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| Error::message("tailscale status timed out"))?
        .map_err(Error::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::message(format!("tailscale status failed: {stderr}")));
        }
        serde_json::from_slice(&output.stdout).map_err(Error::Json)
    }
}

fn peer_matching(
    status: &serde_json::Value,
    pointer: &str,
    addr: IpAddr,
    tailnet: &Option<String>,
) -> Option<PeerInfo> {
    let node = status.pointer(pointer)?;
    let ips = node.pointer("/TailscaleIPs")?.as_array()?;
    let matches = ips.iter().any(|ip| ip.as_str().is_some_and(|s| s.parse::<IpAddr>() == Ok(addr)));
    if !matches {
        return None;
    }

    let hostname = node
        .get("DNSName")
        .and_then(|v| v.as_str())
        .map(|s| s.trim_end_matches('.').to_string())
        .or_else(|| node.get("HostName").and_then(|v| v.as_str()).map(String::from))?;

    let login_name = node.pointer("/UserID").and_then(|uid| {
        status.pointer(&format!("/User/{uid}/LoginName")).and_then(|v| v.as_str()).map(String::from)
    });

    Some(PeerInfo { hostname, login_name, tailnet: tailnet.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_status() -> serde_json::Value {
        serde_json::json!({
            "CurrentTailnet": { "Name": "example.ts.net" },
            "Self": {
                "DNSName": "owner-laptop.example.ts.net.",
                "TailscaleIPs": ["100.64.1.2"],
                "UserID": 1,
            },
            "Peer": {
                "nodekey:abc": {
                    "HostName": "friend-phone",
                    "TailscaleIPs": ["100.64.1.3"],
                    "UserID": 2,
                }
            },
            "User": {
                "1": { "LoginName": "owner@example.com" },
                "2": { "LoginName": "friend@example.com" },
            },
        })
    }

    #[test]
    fn matches_self_by_ip() {
        let status = sample_status();
        let info = peer_matching(&status, "/Self", "100.64.1.2".parse().unwrap(), &Some("example.ts.net".into()));
        let info = info.unwrap();
        assert_eq!(info.hostname, "owner-laptop.example.ts.net");
        assert_eq!(info.login_name.as_deref(), Some("owner@example.com"));
    }

    #[test]
    fn matches_peer_by_ip() {
        let status = sample_status();
        let info = peer_matching(&status, "/Peer/nodekey:abc", "100.64.1.3".parse().unwrap(), &None);
        let info = info.unwrap();
        assert_eq!(info.hostname, "friend-phone");
        assert_eq!(info.login_name.as_deref(), Some("friend@example.com"));
    }

    #[test]
    fn no_match_returns_none() {
        let status = sample_status();
        assert!(peer_matching(&status, "/Self", "10.0.0.1".parse().unwrap(), &None).is_none());
    }
}
