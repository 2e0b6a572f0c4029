use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] chatgate_store::Error),

    #[error("pairing request not found for this channel")]
    NotFound,

    #[error("channel already has the maximum number of pending pairing requests")]
    TooManyPending,

    #[error("user is already paired")]
    AlreadyPaired,
}

pub type Result<T> = std::result::Result<T, Error>;
