use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pairing(#[from] chatgate_pairing::Error),

    #[error("unknown command {0:?}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;
