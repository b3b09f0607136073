use thiserror::Error;

/// Failures surfaced by a storage accessor.
///
/// SECURITY: Error messages must NEVER contain credentials or signatures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object at the configured key
    #[error("object not found: '{key}'")]
    NotFound { key: String },

    /// Credentials rejected or insufficient permissions
    #[error("access denied: {message}")]
    AccessDenied { message: String },

    /// Network-level error (connection failed, timeout, etc.)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Store answered with an unexpected status
    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Downloaded bytes do not hash to the reported digest
    #[error("digest mismatch for '{key}': expected {expected}, got {actual}")]
    DigestMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
