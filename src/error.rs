use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("unknown song: {0}")]
    UnknownSong(String),
}

pub type Result<T> = std::result::Result<T, Error>;
