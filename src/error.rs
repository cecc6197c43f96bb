use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("image not found: {0}")]
    ImageUnknown(String),

    #[error("parent image not found: {0}")]
    ParentImageUnknown(String),

    #[error("ancestry of {0} would contain a cycle")]
    AncestryCycle(String),

    #[error("invalid image metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
