//! Pairing service operations (§4.2).

use std::net::{IpAddr, SocketAddr};

use chatgate_store::{PairedBy, PairedUserRow, PairingRequestRow, Store, paired_users, pairing_requests, timestamp, wallet_links, wallet_pairing_codes};
use chatgate_tailscale::{PeerInfo, TailscaleClient};
use tracing::warn;

use crate::{
    code,
    error::{Error, Result},
    locality,
    trust::TrustLevel,
};

/// I2: at most this many live pairing requests per channel at once.
pub const MAX_PENDING_PER_CHANNEL: i64 = 3;

/// PairingRequest / WalletPairingCode lifetime (§3 data model).
fn code_ttl() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// Outcome of `check_auto_approve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoApproveReason {
    Local,
    Tailscale,
}

#[derive(Debug, Clone)]
pub struct AutoApproveResult {
    pub approved: bool,
    pub reason: Option<AutoApproveReason>,
    /// Set when `reason` is `Tailscale`: the matched peer's tailnet
    /// identity, for approval logs and operator-facing notifications.
    pub peer_info: Option<PeerInfo>,
}

/// Remote-address context passed to `check_auto_approve`, mirroring what an
/// HTTP/webhook adapter can observe about the connection.
#[derive(Debug, Clone)]
pub struct RemoteContext {
    pub headers: http::HeaderMap,
    pub remote_addr: SocketAddr,
    pub behind_proxy: bool,
}

/// Config knobs consumed by `check_auto_approve` (sourced from
/// `ChatgateConfig::pairing`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApproveConfig {
    pub auto_approve_local: bool,
    pub auto_approve_tailscale: bool,
    pub promote_to_owner: bool,
}

/// Business-rule layer on top of `chatgate-store`'s raw tables: code
/// generation, collision rejection-sampling, consume-once semantics, and
/// trust-level queries.
#[derive(Clone)]
pub struct PairingService {
    store: Store,
    tailscale: TailscaleClient,
}

impl PairingService {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store, tailscale: TailscaleClient::new() }
    }

    /// `createPairingRequest(channel,userId,username?) → code?`.
    pub async fn create_pairing_request(
        &self,
        channel: &str,
        user_id: &str,
        username: Option<&str>,
    ) -> Result<Option<String>> {
        if paired_users::get(self.store.pool(), channel, user_id).await?.is_some() {
            return Err(Error::AlreadyPaired);
        }

        if let Some(existing) = pairing_requests::get_for_user(self.store.pool(), channel, user_id).await? {
            if timestamp::parse(&existing.expires_at).is_ok_and(|exp| exp > chrono::Utc::now()) {
                return Ok(Some(existing.code));
            }
            pairing_requests::delete_by_code(self.store.pool(), &existing.code).await?;
        }

        let pending = pairing_requests::count_for_channel(self.store.pool(), channel).await?;
        if pending >= MAX_PENDING_PER_CHANNEL {
            return Ok(None);
        }

        let new_code = self.mint_unique_code().await?;
        let now = chrono::Utc::now();
        let row = PairingRequestRow {
            code: new_code.clone(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            username: username.map(str::to_string),
            created_at: timestamp::format(now),
            expires_at: timestamp::format(now + code_ttl()),
        };
        pairing_requests::insert(self.store.pool(), &row).await?;
        Ok(Some(new_code))
    }

    async fn mint_unique_code(&self) -> Result<String> {
        loop {
            let candidate = code::generate();
            let taken = pairing_requests::code_exists(self.store.pool(), &candidate).await?
                || wallet_pairing_codes::code_exists(self.store.pool(), &candidate).await?;
            if !taken {
                return Ok(candidate);
            }
        }
    }

    /// `validateCode(code) → request?`. Consume-once: deletes the pairing
    /// row and upserts the paired user atomically with respect to callers
    /// (sqlite serializes the two statements on the shared pool).
    pub async fn validate_code(&self, raw_code: &str) -> Result<Option<PairingRequestRow>> {
        let normalized = code::normalize(raw_code);
        let Some(request) = pairing_requests::get_by_code(self.store.pool(), &normalized).await? else {
            return Ok(None);
        };

        if timestamp::parse(&request.expires_at).is_ok_and(|exp| exp <= chrono::Utc::now()) {
            pairing_requests::delete_by_code(self.store.pool(), &request.code).await?;
            return Ok(None);
        }

        pairing_requests::delete_by_code(self.store.pool(), &request.code).await?;
        paired_users::upsert(
            self.store.pool(),
            &PairedUserRow {
                channel: request.channel.clone(),
                user_id: request.user_id.clone(),
                username: request.username.clone(),
                paired_at: timestamp::now(),
                paired_by: PairedBy::Code.as_str().to_string(),
                is_owner: 0,
            },
        )
        .await?;

        Ok(Some(request))
    }

    /// `approveRequest(channel,code)`: an operator-initiated equivalent of
    /// `validate_code` that additionally checks the channel matches.
    pub async fn approve_request(&self, channel: &str, raw_code: &str) -> Result<PairingRequestRow> {
        let normalized = code::normalize(raw_code);
        let request = pairing_requests::get_by_code(self.store.pool(), &normalized)
            .await?
            .ok_or(Error::NotFound)?;
        if request.channel != channel {
            return Err(Error::NotFound);
        }
        pairing_requests::delete_by_code(self.store.pool(), &request.code).await?;
        paired_users::upsert(
            self.store.pool(),
            &PairedUserRow {
                channel: request.channel.clone(),
                user_id: request.user_id.clone(),
                username: request.username.clone(),
                paired_at: timestamp::now(),
                paired_by: PairedBy::Code.as_str().to_string(),
                is_owner: 0,
            },
        )
        .await?;
        Ok(request)
    }

    /// `rejectRequest(channel,code)`: consume-once, channel must match.
    pub async fn reject_request(&self, channel: &str, raw_code: &str) -> Result<()> {
        let normalized = code::normalize(raw_code);
        let request = pairing_requests::get_by_code(self.store.pool(), &normalized)
            .await?
            .ok_or(Error::NotFound)?;
        if request.channel != channel {
            return Err(Error::NotFound);
        }
        pairing_requests::delete_by_code(self.store.pool(), &request.code).await?;
        Ok(())
    }

    /// `checkAutoApprove(channel,userId,remoteAddress?)`.
    pub async fn check_auto_approve(
        &self,
        channel: &str,
        user_id: &str,
        remote: Option<&RemoteContext>,
        config: AutoApproveConfig,
    ) -> Result<AutoApproveResult> {
        let Some(remote) = remote else {
            return Ok(AutoApproveResult { approved: false, reason: None, peer_info: None });
        };

        let (reason, peer_info) = if config.auto_approve_local
            && locality::is_local_connection(&remote.headers, remote.remote_addr, remote.behind_proxy)
        {
            (Some(AutoApproveReason::Local), None)
        } else if config.auto_approve_tailscale {
            match self.confirmed_tailscale_peer(remote.remote_addr.ip()).await {
                Some(peer) => (Some(AutoApproveReason::Tailscale), Some(peer)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let Some(reason) = reason else {
            return Ok(AutoApproveResult { approved: false, reason: None, peer_info: None });
        };

        paired_users::upsert(
            self.store.pool(),
            &PairedUserRow {
                channel: channel.to_string(),
                user_id: user_id.to_string(),
                username: None,
                paired_at: timestamp::now(),
                paired_by: PairedBy::Auto.as_str().to_string(),
                is_owner: i64::from(config.promote_to_owner),
            },
        )
        .await?;

        Ok(AutoApproveResult { approved: true, reason: Some(reason), peer_info })
    }

    /// Confirms `addr` is an actual member of the local tailnet, not just an
    /// address in Tailscale's CGNAT range. `is_tailscale_peer_addr` is a
    /// cheap pre-filter that avoids shelling out to `tailscale status` for
    /// addresses that plainly aren't in range; `lookup_peer` is the real
    /// membership check and the one auto-approve actually trusts. A failed
    /// or unavailable `tailscale` CLI fails closed — no peer, no approval.
    async fn confirmed_tailscale_peer(&self, addr: IpAddr) -> Option<PeerInfo> {
        if !locality::is_tailscale_peer_addr(addr) {
            return None;
        }
        match self.tailscale.lookup_peer(addr).await {
            Ok(peer) => peer,
            Err(err) => {
                warn!(error = %err, "tailscale peer lookup failed, denying auto-approve");
                None
            },
        }
    }

    /// `TrustLevel` for `(channel, userId)`.
    pub async fn trust_level(&self, channel: &str, user_id: &str) -> Result<TrustLevel> {
        let row = paired_users::get(self.store.pool(), channel, user_id).await?;
        Ok(TrustLevel::from_paired_user(row.as_ref()))
    }

    /// `createWalletPairingCode(wallet)`.
    pub async fn create_wallet_pairing_code(&self, wallet_address: &str) -> Result<String> {
        let new_code = self.mint_unique_code().await?;
        let now = chrono::Utc::now();
        wallet_pairing_codes::insert(
            self.store.pool(),
            &chatgate_store::WalletPairingCodeRow {
                code: new_code.clone(),
                wallet_address: wallet_address.to_string(),
                created_at: timestamp::format(now),
                expires_at: timestamp::format(now + code_ttl()),
            },
        )
        .await?;
        Ok(new_code)
    }

    /// `validateWalletPairingCode(channel,chatUserId,code)`: consumes the
    /// code and upserts a `WalletLink`.
    pub async fn validate_wallet_pairing_code(
        &self,
        channel: &str,
        chat_user_id: &str,
        raw_code: &str,
    ) -> Result<Option<String>> {
        let normalized = code::normalize(raw_code);
        let Some(code_row) = wallet_pairing_codes::get_by_code(self.store.pool(), &normalized).await? else {
            return Ok(None);
        };

        if timestamp::parse(&code_row.expires_at).is_ok_and(|exp| exp <= chrono::Utc::now()) {
            wallet_pairing_codes::delete_by_code(self.store.pool(), &code_row.code).await?;
            return Ok(None);
        }

        wallet_pairing_codes::delete_by_code(self.store.pool(), &code_row.code).await?;
        wallet_links::upsert(
            self.store.pool(),
            &chatgate_store::WalletLinkRow {
                channel: channel.to_string(),
                chat_user_id: chat_user_id.to_string(),
                wallet_address: code_row.wallet_address.clone(),
                linked_at: timestamp::now(),
                linked_by: chat_user_id.to_string(),
            },
        )
        .await?;

        Ok(Some(code_row.wallet_address))
    }

    pub async fn get_wallet_for_chat_user(&self, channel: &str, chat_user_id: &str) -> Result<Option<String>> {
        Ok(wallet_links::get_for_chat_user(self.store.pool(), channel, chat_user_id)
            .await?
            .map(|row| row.wallet_address))
    }

    pub async fn get_chat_users_for_wallet(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<chatgate_store::WalletLinkRow>> {
        Ok(wallet_links::list_for_wallet(self.store.pool(), wallet_address).await?)
    }

    pub async fn unlink_chat_user(&self, channel: &str, chat_user_id: &str) -> Result<()> {
        wallet_links::delete(self.store.pool(), channel, chat_user_id).await?;
        Ok(())
    }

    /// Sweep every table for rows past `expiresAt`. Used by the periodic
    /// reaper; correctness does not depend on this running promptly since
    /// every read path also checks expiry.
    pub async fn reap_expired(&self) -> Result<u64> {
        let a = pairing_requests::delete_expired(self.store.pool()).await?;
        let b = wallet_pairing_codes::delete_expired(self.store.pool()).await?;
        Ok(a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> PairingService {
        let store = Store::in_memory().await.unwrap();
        PairingService::new(store)
    }

    #[tokio::test]
    async fn create_then_validate_round_trips() {
        let svc = service().await;
        let code = svc
            .create_pairing_request("telegram", "u1", Some("alice"))
            .await
            .unwrap()
            .unwrap();
        let request = svc.validate_code(&code).await.unwrap().unwrap();
        assert_eq!(request.user_id, "u1");
        assert_eq!(svc.trust_level("telegram", "u1").await.unwrap(), TrustLevel::Paired);
        // Consume-once: the code no longer validates.
        assert!(svc.validate_code(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeat_request_returns_existing_code() {
        let svc = service().await;
        let first = svc.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();
        let second = svc.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn already_paired_rejects_new_request() {
        let svc = service().await;
        let code = svc.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();
        svc.validate_code(&code).await.unwrap();
        assert!(matches!(
            svc.create_pairing_request("telegram", "u1", None).await,
            Err(Error::AlreadyPaired)
        ));
    }

    #[tokio::test]
    async fn channel_pending_cap_enforced() {
        let svc = service().await;
        for i in 0..MAX_PENDING_PER_CHANNEL {
            let code = svc
                .create_pairing_request("telegram", &format!("u{i}"), None)
                .await
                .unwrap();
            assert!(code.is_some());
        }
        let overflow = svc.create_pairing_request("telegram", "uX", None).await.unwrap();
        assert!(overflow.is_none());
    }

    #[tokio::test]
    async fn wallet_pairing_round_trips() {
        let svc = service().await;
        let code = svc.create_wallet_pairing_code("0xabc").await.unwrap();
        let wallet = svc
            .validate_wallet_pairing_code("telegram", "u1", &code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wallet, "0xabc");
        assert_eq!(
            svc.get_wallet_for_chat_user("telegram", "u1").await.unwrap(),
            Some("0xabc".to_string())
        );
        assert!(svc.validate_wallet_pairing_code("telegram", "u2", &code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reject_request_requires_channel_match() {
        let svc = service().await;
        let code = svc.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();
        assert!(matches!(svc.reject_request("webchat", &code).await, Err(Error::NotFound)));
        svc.reject_request("telegram", &code).await.unwrap();
        assert!(svc.validate_code(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn check_auto_approve_without_remote_context_is_noop() {
        let svc = service().await;
        let result = svc
            .check_auto_approve("telegram", "u1", None, AutoApproveConfig::default())
            .await
            .unwrap();
        assert!(!result.approved);
    }

    #[tokio::test]
    async fn check_auto_approve_local_connection() {
        let svc = service().await;
        let remote = RemoteContext {
            headers: http::HeaderMap::new(),
            remote_addr: "127.0.0.1:9999".parse().unwrap(),
            behind_proxy: false,
        };
        let result = svc
            .check_auto_approve(
                "telegram",
                "u1",
                Some(&remote),
                AutoApproveConfig { auto_approve_local: true, ..Default::default() },
            )
            .await
            .unwrap();
        assert!(result.approved);
        assert_eq!(result.reason, Some(AutoApproveReason::Local));
        assert_eq!(svc.trust_level("telegram", "u1").await.unwrap(), TrustLevel::Paired);
    }

    #[tokio::test]
    async fn check_auto_approve_tailscale_fails_closed_without_cli() {
        // CGNAT-range address, but no `tailscale` binary in the test
        // sandbox: lookup_peer errors, and auto-approve must deny rather
        // than fall back to the CIDR pre-filter alone.
        let svc = service().await;
        let remote = RemoteContext {
            headers: http::HeaderMap::new(),
            remote_addr: "100.101.2.3:9999".parse().unwrap(),
            behind_proxy: false,
        };
        let result = svc
            .check_auto_approve(
                "telegram",
                "u1",
                Some(&remote),
                AutoApproveConfig { auto_approve_tailscale: true, ..Default::default() },
            )
            .await
            .unwrap();
        assert!(!result.approved);
        assert!(result.peer_info.is_none());
    }
}
