use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use std::time::Duration;

use super::AdapterError;
use crate::providers::PlatformKind;
use crate::utils::logging::truncate_chars;

pub(crate) type PkgsRequestTokenError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

/// Maps a failed client-credentials exchange onto the adapter taxonomy.
///
/// A structured error from the token endpoint (`invalid_client`, ...) is an auth failure;
/// transport problems are transient.
pub(crate) fn adapter_error_from_token_error(
    platform: PlatformKind,
    timeout: Duration,
    e: PkgsRequestTokenError,
) -> AdapterError {
    match e {
        RequestTokenError::ServerResponse(err) => {
            let mut message = err.error().to_string();
            if let Some(description) = err.error_description() {
                message = format!("{message}: {description}");
            }
            AdapterError::AuthFailure { platform, message }
        }
        RequestTokenError::Request(wrapper) => match wrapper {
            HttpClientError::Reqwest(real_err) => {
                AdapterError::from_transport(platform, timeout, &real_err)
            }
            other => AdapterError::TransientNetwork {
                platform,
                message: format!("HttpClientError: {other:?}"),
            },
        },
        RequestTokenError::Parse(parse_err, body) => {
            let body_str = String::from_utf8_lossy(&body);
            let body = truncate_chars(&body_str, 100);
            AdapterError::Decode {
                platform,
                message: format!("token endpoint: {parse_err}. Body: {body}"),
            }
        }
        RequestTokenError::Other(message) => AdapterError::Decode { platform, message },
    }
}
