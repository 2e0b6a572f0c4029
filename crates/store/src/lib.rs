//! Persistent state layout for the gateway's pairing, wallet-link,
//! message-log and channel-config tables (§6.4). One sqlite pool, opened
//! once at boot and owned by the orchestrator for the process lifetime
//! (§9 "ownership of long-lived state").
//!
//! This crate only knows about rows and SQL; the business rules (code
//! alphabet, collision rejection-sampling, consume-once semantics) live in
//! `chatgate-pairing`, which is built on top of the functions here.
//! `message_log`/`channel_store` back the `chatgate-channels` persistence
//! traits directly, since those have no business logic of their own.

pub mod channel_store;
pub mod error;
pub mod message_log;
pub mod paired_users;
pub mod pairing_requests;
pub mod store;
pub mod timestamp;
pub mod wallet_links;
pub mod wallet_pairing_codes;

pub use channel_store::SqliteChannelStore;
pub use error::{Error, Result};
pub use message_log::SqliteMessageLog;
pub use paired_users::{PairedBy, PairedUserRow};
pub use pairing_requests::PairingRequestRow;
pub use store::Store;
pub use wallet_links::WalletLinkRow;
pub use wallet_pairing_codes::WalletPairingCodeRow;
