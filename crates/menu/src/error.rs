use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unrecognized menu action {0:?}")]
    UnknownAction(String),

    #[error("callback token exceeds 64 bytes")]
    TokenTooLong,

    #[error("invalid size input: {0}")]
    InvalidSize(String),

    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
