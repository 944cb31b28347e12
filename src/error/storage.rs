use thiserror::Error as ThisError;

use super::IsRetryable;

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ractor error: {0}")]
    Actor(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl IsRetryable for StorageError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        )
    }
}
