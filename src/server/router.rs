use crate::server::guards::auth::RequireKeyAuth;
use crate::server::routes::{dashboard, integrations};
use crate::sync::SyncOrchestrator;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use base64::Engine as _;
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct PainelState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub painel_key: Arc<str>,
    /// Parent of the tokens handed to on-demand `sync_all` batches.
    pub shutdown: CancellationToken,
}

impl PainelState {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        painel_key: Arc<str>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            painel_key,
            shutdown,
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(generate_request_id, str::to_string);

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status().as_u16();
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    if resp.status().is_server_error() {
        error!(status, %request_id, %method, %path, latency_ms, "request");
    } else if resp.status().is_client_error() {
        warn!(status, %request_id, %method, %path, latency_ms, "request");
    } else {
        info!(status, %request_id, %method, %path, latency_ms, "request");
    }

    resp
}

pub fn painel_router(state: PainelState) -> Router {
    let api = Router::new()
        .merge(dashboard::router())
        .merge(integrations::router())
        .layer(middleware::from_extractor_with_state::<RequireKeyAuth, _>(
            state.clone(),
        ));

    Router::new()
        .nest("/api", api)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
