//! Cross-module pairing lifecycle scenarios (§8 round-trip/idempotence
//! properties), exercised against an in-memory store rather than the
//! per-file unit tests in `src/service.rs`.

use chatgate_pairing::{PairingService, TrustLevel};
use chatgate_store::Store;

async fn service() -> PairingService {
    PairingService::new(Store::in_memory().await.unwrap())
}

#[tokio::test]
async fn pending_requests_are_independent_per_channel() {
    let svc = service().await;
    let tg_code = svc.create_pairing_request("telegram", "u1", None).await.unwrap().unwrap();
    let wc_code = svc.create_pairing_request("webchat", "u1", None).await.unwrap().unwrap();
    assert_ne!(tg_code, wc_code);

    svc.validate_code(&tg_code).await.unwrap();
    assert_eq!(svc.trust_level("telegram", "u1").await.unwrap(), TrustLevel::Paired);
    assert_eq!(svc.trust_level("webchat", "u1").await.unwrap(), TrustLevel::Stranger);

    // The webchat code is still independently live.
    let request = svc.validate_code(&wc_code).await.unwrap().unwrap();
    assert_eq!(request.channel, "webchat");
}

#[tokio::test]
async fn approve_and_reject_are_mutually_exclusive_outcomes() {
    let svc = service().await;
    let accepted = svc.create_pairing_request("telegram", "accepted", None).await.unwrap().unwrap();
    let rejected = svc.create_pairing_request("telegram", "rejected", None).await.unwrap().unwrap();

    svc.approve_request("telegram", &accepted).await.unwrap();
    svc.reject_request("telegram", &rejected).await.unwrap();

    assert_eq!(svc.trust_level("telegram", "accepted").await.unwrap(), TrustLevel::Paired);
    assert_eq!(svc.trust_level("telegram", "rejected").await.unwrap(), TrustLevel::Stranger);
    // Both codes are now dead regardless of which path consumed them.
    assert!(svc.validate_code(&accepted).await.unwrap().is_none());
    assert!(svc.validate_code(&rejected).await.unwrap().is_none());
}

#[tokio::test]
async fn wallet_links_are_queryable_both_directions() {
    let svc = service().await;
    let code = svc.create_wallet_pairing_code("0xfeed").await.unwrap();
    svc.validate_wallet_pairing_code("telegram", "chat-u1", &code).await.unwrap();
    svc.validate_wallet_pairing_code("telegram", "chat-u1", &code).await.ok(); // already consumed, no-op

    let users = svc.get_chat_users_for_wallet("0xfeed").await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].chat_user_id, "chat-u1");

    svc.unlink_chat_user("telegram", "chat-u1").await.unwrap();
    assert!(svc.get_wallet_for_chat_user("telegram", "chat-u1").await.unwrap().is_none());
}

#[tokio::test]
async fn reap_expired_is_idempotent_and_covers_both_tables() {
    let svc = service().await;
    svc.create_pairing_request("telegram", "u1", None).await.unwrap();
    svc.create_wallet_pairing_code("0xabc").await.unwrap();

    // Nothing is expired yet.
    assert_eq!(svc.reap_expired().await.unwrap(), 0);
    // Running it again changes nothing.
    assert_eq!(svc.reap_expired().await.unwrap(), 0);
}
