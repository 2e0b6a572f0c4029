//! Pairing service: codes, trust levels, wallet linking, and the reaper
//! (§4.2). Built on the raw tables in `chatgate-store`.

pub mod code;
pub mod error;
pub mod locality;
pub mod reaper;
pub mod service;
pub mod trust;

pub use {
    error::{Error, Result},
    reaper::spawn_reaper,
    service::{AutoApproveConfig, AutoApproveReason, AutoApproveResult, PairingService, RemoteContext},
    trust::TrustLevel,
};
