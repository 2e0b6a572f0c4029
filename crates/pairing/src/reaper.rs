//! Periodic reaper (§4.2 "Reaping"): removes expired `PairingRequest` and
//! `WalletPairingCode` rows at an interval of at most 60s. Correctness does
//! not depend on this running promptly — every read path also checks
//! expiry and deletes on miss.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::service::PairingService;

pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn the background sweep loop. The returned handle is owned by the
/// orchestrator and aborted on shutdown.
pub fn spawn_reaper(service: PairingService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match service.reap_expired().await {
                Ok(count) if count > 0 => {
                    tracing::debug!(count, "reaped expired pairing rows");
                },
                Ok(_) => {},
                Err(err) => {
                    tracing::warn!(error = %err, "pairing reaper sweep failed");
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chatgate_store::Store;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reaper_removes_expired_requests() {
        let store = Store::in_memory().await.unwrap();
        let service = PairingService::new(store.clone());
        let code = service.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();

        // Force immediate expiry by writing a past-dated row directly.
        chatgate_store::pairing_requests::delete_by_code(store.pool(), &code).await.unwrap();
        chatgate_store::pairing_requests::insert(
            store.pool(),
            &chatgate_store::PairingRequestRow {
                code: code.clone(),
                channel: "telegram".into(),
                user_id: "u1".into(),
                username: None,
                created_at: "2020-01-01T00:00:00Z".into(),
                expires_at: "2020-01-01T01:00:00Z".into(),
            },
        )
        .await
        .unwrap();

        let handle = spawn_reaper(service.clone(), Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
        handle.abort();

        assert!(service.validate_code(&code).await.unwrap().is_none());
    }
}
