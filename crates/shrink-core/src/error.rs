use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record with the same `(raw, user_id)` pair or slug already exists.
    #[error("find shortened URL with the same raw URL")]
    UniqueViolation,
    #[error("userID is empty")]
    EmptyUserId,
    #[error("operation not supported by this storage: {0}")]
    Unsupported(&'static str),
    #[error("storage is closed")]
    Closed,
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record encoding failed: {0}")]
    Codec(String),
    #[error("stored log is corrupted: {0}")]
    Corrupted(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

/// Errors surfaced by the shortening service.
#[derive(Debug, Error)]
pub enum ShortenerError {
    #[error("invalid creation: {0}")]
    InvalidCreation(String),
    #[error("unique violation")]
    UniqueViolation,
    #[error("empty batch")]
    EmptyBatch,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::UniqueViolation => Self::UniqueViolation,
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_stable_sentinel() {
        let err: ShortenerError = StorageError::UniqueViolation.into();
        assert!(matches!(err, ShortenerError::UniqueViolation));
    }

    #[test]
    fn other_storage_errors_pass_through() {
        let err: ShortenerError = StorageError::Query("boom".to_string()).into();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Query(_))));
        assert_eq!(err.to_string(), "storage query failed: boom");
    }
}
