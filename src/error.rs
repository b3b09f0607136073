use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("StateFile does not exist at key '{key}'")]
    StateFileMissing { key: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("malformed state document: {0}")]
    MalformedDocument(String),

    #[error("failed to serialize metadata: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("output name '{0}' is not a safe file name")]
    UnsafeOutputName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
