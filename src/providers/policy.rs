use crate::error::AdapterError;
use crate::providers::PlatformKind;
use crate::utils::logging::{truncate_chars, with_pretty_json_debug};
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

/// Structured error envelope of a platform API.
pub trait MappingAction: std::fmt::Debug + DeserializeOwned + Serialize {
    /// Credentials are invalid or expired, whatever the HTTP status says.
    fn is_auth_error(&self) -> bool;

    /// Platform-specific throttling signal, handled like a 429.
    fn is_throttled(&self) -> bool {
        false
    }

    fn describe(&self) -> Option<String>;
}

/// Classifies a non-success response that survived the retry layer.
pub(crate) async fn classify_upstream_error<E>(
    platform: PlatformKind,
    resp: reqwest::Response,
) -> AdapterError
where
    E: MappingAction,
{
    let status = resp.status();
    let bytes = resp.bytes().await.unwrap_or_default();
    let raw_body_owned = String::from_utf8_lossy(&bytes).into_owned();
    let preview = truncate_chars(&raw_body_owned, UPSTREAM_BODY_PREVIEW_CHARS).into_owned();

    let structured = serde_json::from_slice::<E>(&bytes).ok();
    if let Some(error) = &structured {
        with_pretty_json_debug(error, |pretty_error| {
            tracing::debug!(
                %platform,
                %status,
                ?error,
                body = %pretty_error,
                "Upstream structured error"
            );
        });
    } else {
        tracing::debug!(%platform, %status, body = %preview, "Upstream unstructured error");
    }

    let message = structured
        .as_ref()
        .and_then(MappingAction::describe)
        .unwrap_or_else(|| format!("upstream returned {status}"));

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || structured.as_ref().is_some_and(MappingAction::is_auth_error)
    {
        return AdapterError::AuthFailure { platform, message };
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
        || structured.as_ref().is_some_and(MappingAction::is_throttled)
    {
        return AdapterError::TransientNetwork { platform, message };
    }

    AdapterError::Upstream {
        platform,
        status,
        body: preview,
    }
}

/// Decodes a success body, mapping malformed payloads to `Decode`.
pub(crate) async fn decode_json<T>(
    platform: PlatformKind,
    resp: reqwest::Response,
    timeout: std::time::Duration,
) -> Result<T, AdapterError>
where
    T: DeserializeOwned + Serialize,
{
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AdapterError::from_transport(platform, timeout, &e))?;

    let value = serde_json::from_slice::<T>(&bytes).map_err(|e| {
        let raw = String::from_utf8_lossy(&bytes);
        tracing::warn!(
            %platform,
            error = %e,
            body = %truncate_chars(&raw, UPSTREAM_BODY_PREVIEW_CHARS),
            "Upstream payload failed to decode"
        );
        AdapterError::Decode {
            platform,
            message: e.to_string(),
        }
    })?;

    with_pretty_json_debug(&value, |body| {
        tracing::debug!(%platform, body = %body, "Upstream payload");
    });
    Ok(value)
}

impl MappingAction for painel_schema::FacebookErrorBody {
    fn is_auth_error(&self) -> bool {
        self.is_token_error()
    }

    fn is_throttled(&self) -> bool {
        painel_schema::FacebookErrorBody::is_throttled(self)
    }

    fn describe(&self) -> Option<String> {
        self.error.message.clone()
    }
}

impl MappingAction for painel_schema::HotmartErrorBody {
    fn is_auth_error(&self) -> bool {
        self.is_token_error()
    }

    fn describe(&self) -> Option<String> {
        Some(painel_schema::HotmartErrorBody::describe(self))
    }
}

impl MappingAction for painel_schema::PerfectPayErrorBody {
    fn is_auth_error(&self) -> bool {
        self.message
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("unauthenticated."))
    }

    fn describe(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

impl MappingAction for painel_schema::MercadoPagoErrorBody {
    fn is_auth_error(&self) -> bool {
        self.is_token_error()
    }

    fn describe(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}
