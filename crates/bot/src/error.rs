use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Teloxide(#[from] teloxide::RequestError),

    #[error(transparent)]
    Pairing(#[from] chatgate_pairing::Error),

    #[error("unknown account {0:?}")]
    UnknownAccount(String),
}

pub type Result<T> = std::result::Result<T, Error>;
