use thiserror::Error as ThisError;

use super::{AdapterError, IsRetryable, StorageError};
use crate::providers::PlatformKind;
use crate::sync::{ConnectionKey, ConnectionStatus};

#[derive(Debug, ThisError)]
pub enum SyncError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Adapter failure tagged with the connection it happened on.
    #[error("[{platform}/{account_id}] {source}")]
    Adapter {
        platform: PlatformKind,
        account_id: String,
        #[source]
        source: AdapterError,
    },

    /// The record was not durably saved, even if the remote fetch succeeded.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionKey),

    #[error("Connection {key} is {status}")]
    NotConnected {
        key: ConnectionKey,
        status: ConnectionStatus,
    },

    #[error("Invalid sync window: {0}")]
    InvalidWindow(String),

    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn adapter(key: &ConnectionKey, source: AdapterError) -> Self {
        match source {
            AdapterError::UnsupportedPlatform(id) => SyncError::UnsupportedPlatform(id),
            source => SyncError::Adapter {
                platform: key.platform,
                account_id: key.account_id.clone(),
                source,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SyncError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            SyncError::Adapter { source, .. } => source.code(),
            SyncError::Storage(_) => "STORAGE_FAILURE",
            SyncError::ConnectionNotFound(_) => "CONNECTION_NOT_FOUND",
            SyncError::NotConnected { .. } => "NOT_CONNECTED",
            SyncError::InvalidWindow(_) => "INVALID_WINDOW",
            SyncError::Cancelled => "CANCELLED",
        }
    }
}

impl IsRetryable for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            SyncError::Adapter { source, .. } => source.is_retryable(),
            SyncError::Storage(e) => e.is_retryable(),
            SyncError::Cancelled => true,
            _ => false,
        }
    }
}
