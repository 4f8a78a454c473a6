use thiserror::Error;

use crate::config::BucketRole;

/// Failures surfaced by the lifecycle manager.
///
/// Store-level errors never escape as `anyhow::Error`; they are wrapped in
/// [`StorageError::Transport`] together with the operation and key that
/// produced them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A bucket required by the operation has no configured name.
    #[error("{0} bucket is not configured")]
    ConfigMissing(BucketRole),

    /// The caller passed something the manager cannot normalize.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("{operation} failed for {bucket}/{key}: {source:#}")]
    Transport {
        operation: &'static str,
        bucket: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("object {bucket}/{key} is not valid JSON: {source}")]
    Parse {
        bucket: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigMissing,
    InvalidInput,
    NotFound,
    Transport,
    Parse,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::ConfigMissing(_) => ErrorKind::ConfigMissing,
            StorageError::InvalidInput(_) => ErrorKind::InvalidInput,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Transport { .. } => ErrorKind::Transport,
            StorageError::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// Only transport failures can succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub(crate) fn transport(
        operation: &'static str,
        bucket: &str,
        key: &str,
    ) -> impl FnOnce(anyhow::Error) -> Self {
        let bucket = bucket.to_string();
        let key = key.to_string();
        move |source| StorageError::Transport {
            operation,
            bucket,
            key,
            source,
        }
    }
}
