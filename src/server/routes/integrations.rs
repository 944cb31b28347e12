use super::parse_platform;
use crate::error::{PainelError, SyncError};
use crate::providers::{PlatformCredentials, PlatformKind, SyncWindow};
use crate::server::guards::auth::VerifiedUser;
use crate::server::router::PainelState;
use crate::sync::{AccountSyncResult, ConnectionKey, PlatformConnection};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn router() -> Router<PainelState> {
    Router::new()
        .route("/integrations", get(list_handler))
        .route("/integrations/platforms", get(platforms_handler))
        .route("/integrations/sync", post(sync_all_handler))
        .route("/integrations/{platform}/connect", post(connect_handler))
        .route("/integrations/{platform}/{account_id}", delete(disconnect_handler))
        .route("/integrations/{platform}/{account_id}/sync", post(sync_handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectBody {
    pub account_id: String,
    #[serde(default)]
    pub credentials: PlatformCredentials,
}

/// Optional explicit range for an on-demand sync, synced as one record per UTC day.
/// Without it the current UTC day is synced.
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub de: Option<DateTime<Utc>>,
    pub ate: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDescriptor {
    pub platform: PlatformKind,
    pub required_credentials: &'static [&'static str],
}

fn connection_key(user_id: String, platform: &str, account_id: String) -> Result<ConnectionKey, PainelError> {
    Ok(ConnectionKey::new(user_id, parse_platform(platform)?, account_id))
}

async fn list_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
) -> Result<Json<Vec<PlatformConnection>>, PainelError> {
    Ok(Json(state.orchestrator.connections(&user_id).await?))
}

async fn platforms_handler(State(state): State<PainelState>) -> Json<Vec<PlatformDescriptor>> {
    Json(
        state
            .orchestrator
            .registry()
            .platforms()
            .into_iter()
            .map(|platform| PlatformDescriptor {
                platform,
                required_credentials: platform.required_credentials(),
            })
            .collect(),
    )
}

async fn connect_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
    Path(platform): Path<String>,
    payload: Result<Json<ConnectBody>, JsonRejection>,
) -> Result<Json<PlatformConnection>, PainelError> {
    let Json(body) = payload?;
    if body.account_id.trim().is_empty() {
        return Err(PainelError::BadRequest("`accountId` must not be empty".into()));
    }
    let connection = state
        .orchestrator
        .connect(&user_id, &platform, &body.account_id, body.credentials)
        .await?;
    Ok(Json(connection))
}

async fn disconnect_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
    Path((platform, account_id)): Path<(String, String)>,
) -> Result<Json<PlatformConnection>, PainelError> {
    let key = connection_key(user_id, &platform, account_id)?;
    Ok(Json(state.orchestrator.disconnect(&key).await?))
}

async fn sync_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
    Path((platform, account_id)): Path<(String, String)>,
    Query(query): Query<SyncQuery>,
) -> Result<Response, PainelError> {
    let key = connection_key(user_id, &platform, account_id)?;
    match (query.de, query.ate) {
        (None, None) => Ok(Json(state.orchestrator.sync(&key).await?).into_response()),
        (Some(start), Some(end)) => {
            let range = SyncWindow::new(start, end).ok_or_else(|| {
                SyncError::InvalidWindow(format!("start {start} is not before end {end}"))
            })?;
            let records = state.orchestrator.sync_range(&key, range).await?;
            Ok(Json(records).into_response())
        }
        _ => Err(PainelError::BadRequest(
            "sync window needs both `de` and `ate`".into(),
        )),
    }
}

async fn sync_all_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
) -> Result<Json<Vec<AccountSyncResult>>, PainelError> {
    let cancel = state.shutdown.child_token();
    Ok(Json(state.orchestrator.sync_all(&user_id, &cancel).await?))
}
