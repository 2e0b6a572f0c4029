//! Gateway-local error type (§10.2). Orchestration errors are surfaced to
//! `main` as `anyhow::Error`; this enum exists so call sites inside the
//! crate can match on a closed set of failure kinds before that happens.

use chatgate_common::{FromMessage, impl_context};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("failed to open the persistent store: {0}")]
    Store(#[from] chatgate_store::Error),

    #[error("failed to start channel {channel} account {account_id}: {source}")]
    ChannelStart {
        channel: String,
        account_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("config reload failed: {0}")]
    Reload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

impl_context!();
