use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error as ThisError;

use super::IsRetryable;
use crate::providers::PlatformKind;

#[derive(Debug, ThisError)]
pub enum AdapterError {
    /// Unknown or disabled platform id. Client error, never retried.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("[{platform}] Missing or empty credential: {key}")]
    InvalidCredentials {
        platform: PlatformKind,
        key: &'static str,
    },

    /// Credentials were rejected or have expired.
    #[error("[{platform}] Authentication failed: {message}")]
    AuthFailure {
        platform: PlatformKind,
        message: String,
    },

    /// Transport failure or 5xx/429 that survived the retry budget.
    #[error("[{platform}] Transient network error: {message}")]
    TransientNetwork {
        platform: PlatformKind,
        message: String,
    },

    #[error("[{platform}] Request timed out after {after:?}")]
    Timeout {
        platform: PlatformKind,
        after: Duration,
    },

    /// Non-retryable upstream rejection. `body` is a preview for diagnostics only.
    #[error("[{platform}] Upstream error: status={status}, body={body:.200}")]
    Upstream {
        platform: PlatformKind,
        status: StatusCode,
        body: String,
    },

    #[error("[{platform}] Failed to decode upstream payload: {message}")]
    Decode {
        platform: PlatformKind,
        message: String,
    },
}

impl AdapterError {
    pub fn platform(&self) -> Option<PlatformKind> {
        match self {
            AdapterError::UnsupportedPlatform(_) => None,
            AdapterError::InvalidCredentials { platform, .. }
            | AdapterError::AuthFailure { platform, .. }
            | AdapterError::TransientNetwork { platform, .. }
            | AdapterError::Timeout { platform, .. }
            | AdapterError::Upstream { platform, .. }
            | AdapterError::Decode { platform, .. } => Some(*platform),
        }
    }

    /// Stable machine-readable code used in API payloads and stored `last_error`s.
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            AdapterError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            AdapterError::AuthFailure { .. } => "PLATFORM_AUTH_FAILED",
            AdapterError::TransientNetwork { .. } => "PLATFORM_UNAVAILABLE",
            AdapterError::Timeout { .. } => "PLATFORM_TIMEOUT",
            AdapterError::Upstream { .. } => "UPSTREAM_ERROR",
            AdapterError::Decode { .. } => "BAD_UPSTREAM_PAYLOAD",
        }
    }

    /// Maps a transport-level reqwest failure, distinguishing timeouts.
    pub(crate) fn from_transport(
        platform: PlatformKind,
        timeout: Duration,
        err: &reqwest::Error,
    ) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout {
                platform,
                after: timeout,
            }
        } else if err.is_decode() {
            AdapterError::Decode {
                platform,
                message: err.to_string(),
            }
        } else {
            AdapterError::TransientNetwork {
                platform,
                message: err.to_string(),
            }
        }
    }
}

impl IsRetryable for AdapterError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterError::TransientNetwork { .. } | AdapterError::Timeout { .. }
        )
    }
}
