use crate::error::{ApiErrorBody, ApiErrorObject};
use crate::server::router::PainelState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use subtle::ConstantTimeEq;

pub const X_PAINEL_KEY: &str = "x-painel-key";
pub const X_USER_ID: &str = "x-user-id";

fn extract_header_token(headers: &HeaderMap) -> Option<String> {
    if let Some(k) = headers.get(X_PAINEL_KEY).and_then(|v| v.to_str().ok()) {
        return Some(k.to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Shared service key check, applied to every `/api` route.
#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl FromRequestParts<PainelState> for RequireKeyAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PainelState,
    ) -> Result<Self, Self::Rejection> {
        let key = extract_header_token(&parts.headers).ok_or(AuthError::MissingKey)?;
        let expected = state.painel_key.as_ref();
        if key.as_bytes().ct_eq(expected.as_bytes()).into() {
            Ok(RequireKeyAuth)
        } else {
            Err(AuthError::InvalidKey)
        }
    }
}

/// User id asserted by the identity gateway in `x-user-id`.
#[derive(Debug, Clone)]
pub struct VerifiedUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for VerifiedUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| VerifiedUser(v.to_string()))
            .ok_or(AuthError::MissingUser)
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingKey,
    InvalidKey,
    MissingUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingKey => "Missing service key",
            AuthError::InvalidKey => "Invalid service key",
            AuthError::MissingUser => "Missing user identity",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiErrorBody {
                inner: ApiErrorObject::new("UNAUTHORIZED", message),
            }),
        )
            .into_response()
    }
}
