use thiserror::Error;

/// Error taxonomy for the document store and its blob store client.
///
/// `Transient` failures are retried inside the client with bounded backoff;
/// every other variant propagates to the caller uninterpreted.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Blob store connection failed: {0}")]
    Connection(String),

    #[error("Blob store request failed: {0}")]
    Permanent(String),

    #[error("Stored document is corrupt: {0}")]
    CorruptDocument(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Write-back failed after retries: {0}")]
    Persistence(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(error: reqwest::Error) -> Self {
        // Malformed response bodies are not worth retrying; transport-level
        // failures (connect, timeout) are.
        if error.is_decode() || error.is_builder() {
            StorageError::Permanent(error.to_string())
        } else {
            StorageError::Transient(error.to_string())
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialize(error.to_string())
    }
}
