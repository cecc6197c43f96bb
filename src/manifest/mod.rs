mod digest;
mod migrate;
pub mod schema;

pub use digest::{Digest, DigestError};
pub use migrate::{ManifestMigrator, Migration};
pub use schema::{ManifestV1, V1Image, storage_location};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("manifest could not be decoded: {0}")]
    ManifestDecodeFailed(#[source] serde_json::Error),

    #[error("manifest invalid: {0}")]
    ManifestInvalid(String),

    #[error("history entry {index} could not be decoded: {source}")]
    LayerDecodeFailed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("layer {index} has an invalid digest: {source}")]
    DigestInvalid {
        index: usize,
        #[source]
        source: DigestError,
    },

    #[error(transparent)]
    StoreWriteFailed(#[from] crate::error::Error),
}
