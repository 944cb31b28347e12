use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

use super::{AdapterError, IsRetryable, StorageError, SyncError};

/// Error surfaced by the HTTP layer.
#[derive(Debug, ThisError)]
pub enum PainelError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Request rejected: {0}")]
    BadRequest(String),

    /// The filtered record set is empty.
    #[error("No metrics found")]
    NoMetrics,
}

impl From<JsonRejection> for PainelError {
    fn from(rejection: JsonRejection) -> Self {
        PainelError::BadRequest(rejection.body_text())
    }
}

impl PainelError {
    fn status_and_body(&self) -> (StatusCode, ApiErrorObject) {
        match self {
            PainelError::Sync(SyncError::Adapter { source, .. }) => adapter_status(source),
            PainelError::Sync(SyncError::UnsupportedPlatform(id)) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject::new("UNSUPPORTED_PLATFORM", format!("Unsupported platform: {id}")),
            ),
            PainelError::Sync(SyncError::ConnectionNotFound(_)) => (
                StatusCode::NOT_FOUND,
                ApiErrorObject::new("CONNECTION_NOT_FOUND", "Integration not found."),
            ),
            PainelError::Sync(SyncError::NotConnected { status, .. }) => (
                StatusCode::CONFLICT,
                ApiErrorObject::new("NOT_CONNECTED", format!("Integration is {status}.")),
            ),
            PainelError::Sync(SyncError::InvalidWindow(msg)) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject::new("INVALID_WINDOW", msg.clone()),
            ),
            PainelError::Sync(SyncError::Cancelled) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorObject::new("CANCELLED", "Sync was cancelled."),
            ),
            PainelError::Sync(SyncError::Storage(_)) | PainelError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
            PainelError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject::new("INVALID_REQUEST", msg.clone()),
            ),
            PainelError::NoMetrics => (
                StatusCode::NOT_FOUND,
                ApiErrorObject::new("NO_METRICS", "No metrics found for the selected filters."),
            ),
        }
    }
}

fn adapter_status(err: &AdapterError) -> (StatusCode, ApiErrorObject) {
    let status = match err {
        AdapterError::UnsupportedPlatform(_) | AdapterError::InvalidCredentials { .. } => {
            StatusCode::BAD_REQUEST
        }
        // The caller is authenticated; its platform credentials are not.
        AdapterError::AuthFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AdapterError::TransientNetwork { .. } | AdapterError::Timeout { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AdapterError::Upstream { .. } | AdapterError::Decode { .. } => StatusCode::BAD_GATEWAY,
    };
    let message = match err {
        AdapterError::Upstream { platform, status, .. } => {
            format!("[{platform}] Upstream returned {status}")
        }
        other => other.to_string(),
    };
    (status, ApiErrorObject::new(err.code(), message))
}

impl IntoResponse for PainelError {
    fn into_response(self) -> Response {
        let (status, error_body) = self.status_and_body();
        if status.is_server_error() {
            tracing::warn!(
                %status,
                code = %error_body.code,
                error = %self,
                retryable = self.is_retryable(),
                "Request failed"
            );
        } else {
            tracing::debug!(%status, code = %error_body.code, error = %self, "Request rejected");
        }
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

impl IsRetryable for PainelError {
    fn is_retryable(&self) -> bool {
        match self {
            PainelError::Sync(e) => e.is_retryable(),
            PainelError::Storage(e) => e.is_retryable(),
            PainelError::BadRequest(_) | PainelError::NoMetrics => false,
        }
    }
}

/// Standardized API error response payload.
#[derive(Debug, Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorObject {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::PlatformKind;

    #[test]
    fn adapter_failures_map_to_http_classes() {
        let wrap = |source| {
            PainelError::Sync(SyncError::Adapter {
                platform: PlatformKind::Hotmart,
                account_id: "acc".into(),
                source,
            })
            .status_and_body()
            .0
        };

        assert_eq!(
            wrap(AdapterError::AuthFailure {
                platform: PlatformKind::Hotmart,
                message: "invalid_client".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            wrap(AdapterError::TransientNetwork {
                platform: PlatformKind::Hotmart,
                message: "reset".into()
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            wrap(AdapterError::Upstream {
                platform: PlatformKind::Hotmart,
                status: StatusCode::BAD_REQUEST,
                body: "{}".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PainelError::Sync(SyncError::UnsupportedPlatform("x".into()))
                .status_and_body()
                .0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PainelError::NoMetrics.status_and_body().0, StatusCode::NOT_FOUND);
    }
}
