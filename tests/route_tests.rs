use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use painel::config::SyncResolvedConfig;
use painel::providers::{
    AdapterRegistry, NormalizedMetrics, NormalizedRecord, PaymentMethod, PlatformKind,
};
use painel::server::{PainelState, painel_router};
use painel::store::{MemoryStore, MetricsStore};
use painel::sync::SyncOrchestrator;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const KEY: &str = "test-key";

fn app(store: Arc<MemoryStore>) -> Router {
    let orchestrator = SyncOrchestrator::new(
        AdapterRegistry::builder().build(),
        store,
        SyncResolvedConfig::default(),
    );
    painel_router(PainelState::new(
        Arc::new(orchestrator),
        Arc::from(KEY),
        CancellationToken::new(),
    ))
}

fn request(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-painel-key", KEY)
        .header("x-user-id", "u1")
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn seed(store: &MemoryStore, platform: PlatformKind, account: &str, days_ago: i64) {
    let start = Utc::now() - Duration::days(days_ago);
    let mut metrics = NormalizedMetrics::default();
    match platform {
        PlatformKind::Facebook => metrics.ad_spend_cents = 30_000,
        _ => metrics.record_sale(Some(1_500.0), PaymentMethod::Pix),
    }
    store
        .put_record(&NormalizedRecord {
            user_id: "u1".into(),
            platform,
            account_id: account.into(),
            product_id: None,
            timestamp: start,
            window_end: start + Duration::days(1),
            synced_at: start,
            metrics,
        })
        .await
        .expect("seed");
}

#[tokio::test]
async fn missing_or_wrong_key_is_unauthorized() {
    let app = app(Arc::new(MemoryStore::new()));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/integrations")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["code"], "UNAUTHORIZED");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/integrations")
                .header("authorization", "Bearer wrong")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_key_is_accepted() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            Request::builder()
                .uri("/api/integrations")
                .header("authorization", format!("Bearer {KEY}"))
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, serde_json::json!([]));
}

#[tokio::test]
async fn missing_user_is_unauthorized() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/metrics")
                .header("x-painel-key", KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_platform_is_a_bad_request() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            request(Method::POST, "/api/integrations/orkut/connect")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"accountId":"a","credentials":{}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "UNSUPPORTED_PLATFORM");
}

#[tokio::test]
async fn malformed_connect_body_is_a_bad_request() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            request(Method::POST, "/api/integrations/hotmart/connect")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn disconnect_of_unknown_connection_is_not_found() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            request(Method::DELETE, "/api/integrations/hotmart/acc-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"]["code"], "CONNECTION_NOT_FOUND");
}

#[tokio::test]
async fn empty_metrics_is_not_found() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            request(Method::GET, "/api/dashboard/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"]["code"], "NO_METRICS");
}

#[tokio::test]
async fn dashboard_metrics_combine_platforms() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, PlatformKind::Hotmart, "hm", 1).await;
    seed(&store, PlatformKind::Facebook, "fb", 1).await;
    seed(&store, PlatformKind::Hotmart, "hm", 60).await;
    let app = app(store);

    let resp = app
        .clone()
        .oneshot(
            request(Method::GET, "/api/dashboard/metrics?periodo=7dias")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["faturamentoLiquido"], 1500.0);
    assert_eq!(body["gastosAnuncios"], 300.0);
    assert_eq!(body["roas"], 5.0);
    assert_eq!(body["lucro"], 1200.0);
    assert_eq!(body["totalVendas"], 1);
    assert_eq!(body["pagamentos"]["pix"], 1500.0);

    let resp = app
        .clone()
        .oneshot(
            request(Method::GET, "/api/dashboard/metrics?periodo=todos&plataforma=hotmart")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["faturamentoLiquido"], 3000.0);
    assert_eq!(body["gastosAnuncios"], 0.0);
    assert_eq!(body["roas"], 0.0);

    let resp = app
        .oneshot(
            request(Method::GET, "/api/dashboard/metrics/platforms?periodo=7dias")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["hotmart"]["faturamentoLiquido"], 1500.0);
    assert_eq!(body["facebook"]["gastosAnuncios"], 300.0);
}

#[tokio::test]
async fn bad_period_is_rejected() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(
            request(Method::GET, "/api/dashboard/metrics?periodo=semana")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let resp = app(Arc::new(MemoryStore::new()))
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key("x-request-id"));
}
