use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use painel::config::SyncResolvedConfig;
use painel::error::{AdapterError, IsRetryable, SyncError};
use painel::metrics::{MetricsFilter, Period, aggregate};
use painel::providers::{
    AdapterRegistry, ConnectRequest, ConnectionInfo, FetchRequest, NormalizedMetrics,
    PlatformAdapter, PlatformCredentials, PlatformKind, SyncWindow,
};
use painel::store::{MemoryStore, MetricsStore, RecordQuery};
use painel::sync::{ConnectionKey, ConnectionStatus, SyncOrchestrator, SyncOutcome, SyncScheduler};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug)]
enum Behavior {
    Ok { revenue_cents: i64 },
    Transient,
    Auth,
    Hang,
}

/// Scripted adapter: behavior is chosen per account id.
struct FakeAdapter {
    kind: PlatformKind,
    behaviors: Mutex<Vec<(String, Behavior)>>,
    fetches: AtomicUsize,
}

impl FakeAdapter {
    fn new(kind: PlatformKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behaviors: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        })
    }

    fn set(&self, account_id: &str, behavior: Behavior) {
        let mut behaviors = self.behaviors.lock().unwrap();
        behaviors.retain(|(a, _)| a != account_id);
        behaviors.push((account_id.to_string(), behavior));
    }

    fn behavior(&self, account_id: &str) -> Behavior {
        self.behaviors
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| a == account_id)
            .map_or(Behavior::Ok { revenue_cents: 0 }, |(_, b)| *b)
    }
}

#[async_trait]
impl PlatformAdapter for FakeAdapter {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    async fn connect(&self, request: ConnectRequest<'_>) -> Result<ConnectionInfo, AdapterError> {
        request.credentials.validate_for(self.kind)?;
        match self.behavior(request.account_id) {
            Behavior::Auth => Err(AdapterError::AuthFailure {
                platform: self.kind,
                message: "invalid token".into(),
            }),
            _ => Ok(ConnectionInfo {
                account_id: request.account_id.to_string(),
                account_name: Some(format!("Conta {}", request.account_id)),
                currency: Some("BRL".into()),
            }),
        }
    }

    async fn fetch_metrics(
        &self,
        request: FetchRequest<'_>,
    ) -> Result<NormalizedMetrics, AdapterError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.behavior(request.account_id) {
            Behavior::Ok { revenue_cents } => {
                let mut metrics = NormalizedMetrics::default();
                metrics.revenue_cents = revenue_cents;
                metrics.transaction_count = 1;
                Ok(metrics)
            }
            Behavior::Transient => Err(AdapterError::TransientNetwork {
                platform: self.kind,
                message: "connection reset".into(),
            }),
            Behavior::Auth => Err(AdapterError::AuthFailure {
                platform: self.kind,
                message: "token revoked".into(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(NormalizedMetrics::default())
            }
        }
    }
}

struct Harness {
    orchestrator: SyncOrchestrator,
    store: Arc<MemoryStore>,
    hotmart: Arc<FakeAdapter>,
}

fn harness() -> Harness {
    let hotmart = FakeAdapter::new(PlatformKind::Hotmart);
    let registry = AdapterRegistry::builder().register(hotmart.clone()).build();
    let store = Arc::new(MemoryStore::new());
    let orchestrator = SyncOrchestrator::new(
        registry,
        store.clone(),
        SyncResolvedConfig {
            max_concurrency: 2,
            request_timeout: Duration::from_secs(5),
            interval: None,
        },
    );
    Harness {
        orchestrator,
        store,
        hotmart,
    }
}

fn hotmart_creds() -> PlatformCredentials {
    PlatformCredentials::new()
        .with("client_id", "cid")
        .with("client_secret", "secret")
        .with("product_id", "prod-9")
}

#[tokio::test]
async fn connect_then_sync_writes_a_record() {
    let h = harness();
    h.hotmart.set("acc-1", Behavior::Ok { revenue_cents: 1_500 });

    let connection = h
        .orchestrator
        .connect("u1", "Hotmart", "acc-1", hotmart_creds())
        .await
        .expect("connect");
    assert_eq!(connection.status, ConnectionStatus::Connected);
    assert_eq!(connection.account_name.as_deref(), Some("Conta acc-1"));

    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");
    let record = h.orchestrator.sync(&key).await.expect("sync");
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.product_id.as_deref(), Some("prod-9"));
    assert_eq!(record.metrics.revenue_cents, 1_500);

    let stored = h.store.get_connection(&key).await.unwrap().expect("stored");
    assert_eq!(stored.connection.status, ConnectionStatus::Connected);
    assert!(stored.connection.last_sync_at.is_some());
}

#[tokio::test]
async fn resync_of_the_same_window_replaces_the_record() {
    let h = harness();
    h.hotmart.set("acc-1", Behavior::Ok { revenue_cents: 100 });
    h.orchestrator
        .connect("u1", "hotmart", "acc-1", hotmart_creds())
        .await
        .expect("connect");

    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");
    let window = SyncWindow::day_of(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    h.orchestrator.sync_window(&key, window).await.expect("first");
    h.hotmart.set("acc-1", Behavior::Ok { revenue_cents: 250 });
    h.orchestrator.sync_window(&key, window).await.expect("second");

    let records = h
        .store
        .list_records(&RecordQuery::for_user("u1"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metrics.revenue_cents, 250);
    assert_eq!(records[0].timestamp, window.start);
}

#[tokio::test]
async fn overlapping_ranges_store_one_record_per_day() {
    let h = harness();
    h.hotmart.set("acc-1", Behavior::Ok { revenue_cents: 10_000 });
    h.orchestrator
        .connect("u1", "hotmart", "acc-1", hotmart_creds())
        .await
        .expect("connect");

    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");
    let may1 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let may2 = may1 + ChronoDuration::days(1);
    let may3 = may1 + ChronoDuration::days(2);

    let first = h
        .orchestrator
        .sync_range(&key, SyncWindow::new(may1, may3).unwrap())
        .await
        .expect("first range");
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|r| r.window_end - r.timestamp == ChronoDuration::days(1)));

    let second = h
        .orchestrator
        .sync_range(&key, SyncWindow::new(may2, may3).unwrap())
        .await
        .expect("overlapping range");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].timestamp, may2);

    let records = h
        .store
        .list_records(&RecordQuery::for_user("u1"))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    let filter = MetricsFilter::new(Period::All, may3);
    let totals = aggregate(&records, &filter);
    assert_eq!(totals.faturamento_liquido, 200.0);
    assert_eq!(totals.total_vendas, 2);
}

#[tokio::test]
async fn sync_window_rejects_multi_day_windows() {
    let h = harness();
    h.orchestrator
        .connect("u1", "hotmart", "acc-1", hotmart_creds())
        .await
        .expect("connect");

    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let before = h.hotmart.fetches.load(Ordering::SeqCst);
    let err = h
        .orchestrator
        .sync_window(&key, SyncWindow::new(start, start + ChronoDuration::days(2)).unwrap())
        .await
        .expect_err("two days");
    assert!(matches!(err, SyncError::InvalidWindow(_)));
    assert_eq!(h.hotmart.fetches.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn unknown_platform_is_rejected_before_any_call() {
    let h = harness();
    let err = h
        .orchestrator
        .connect("u1", "unknown-platform", "acc", hotmart_creds())
        .await
        .expect_err("unsupported");
    assert!(matches!(err, SyncError::UnsupportedPlatform(ref id) if id == "unknown-platform"));
    assert!(!err.is_retryable());
    assert!(h.orchestrator.connections("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_connect_leaves_error_without_credentials() {
    let h = harness();
    h.hotmart.set("acc-1", Behavior::Auth);

    let err = h
        .orchestrator
        .connect("u1", "hotmart", "acc-1", hotmart_creds())
        .await
        .expect_err("auth failure");
    assert!(matches!(
        err,
        SyncError::Adapter {
            source: AdapterError::AuthFailure { .. },
            ..
        }
    ));

    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");
    let stored = h.store.get_connection(&key).await.unwrap().expect("stored");
    assert_eq!(stored.connection.status, ConnectionStatus::Error);
    assert!(stored.connection.last_error.is_some());
    assert_eq!(stored.credentials, None);

    let err = h.orchestrator.sync(&key).await.expect_err("no credentials");
    assert!(matches!(err, SyncError::NotConnected { status: ConnectionStatus::Error, .. }));
}

#[tokio::test]
async fn missing_credential_key_fails_connect() {
    let h = harness();
    let err = h
        .orchestrator
        .connect(
            "u1",
            "hotmart",
            "acc-1",
            PlatformCredentials::new().with("client_id", "cid"),
        )
        .await
        .expect_err("missing secret");
    assert!(matches!(
        err,
        SyncError::Adapter {
            source: AdapterError::InvalidCredentials { key: "client_secret", .. },
            ..
        }
    ));
}

#[tokio::test]
async fn transient_failure_keeps_connected_and_auth_failure_moves_to_error() {
    let h = harness();
    h.orchestrator
        .connect("u1", "hotmart", "acc-1", hotmart_creds())
        .await
        .expect("connect");
    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");

    h.hotmart.set("acc-1", Behavior::Transient);
    let err = h.orchestrator.sync(&key).await.expect_err("transient");
    assert!(err.is_retryable());
    let stored = h.store.get_connection(&key).await.unwrap().expect("stored");
    assert_eq!(stored.connection.status, ConnectionStatus::Connected);
    assert!(stored.connection.last_error.is_some());

    h.hotmart.set("acc-1", Behavior::Auth);
    let err = h.orchestrator.sync(&key).await.expect_err("auth");
    assert!(!err.is_retryable());
    let stored = h.store.get_connection(&key).await.unwrap().expect("stored");
    assert_eq!(stored.connection.status, ConnectionStatus::Error);
    assert!(stored.credentials.is_some(), "credentials survive a failed sync");

    // Error connections with credentials may sync again.
    h.hotmart.set("acc-1", Behavior::Ok { revenue_cents: 10 });
    h.orchestrator.sync(&key).await.expect("recovers");
    let stored = h.store.get_connection(&key).await.unwrap().expect("stored");
    assert_eq!(stored.connection.status, ConnectionStatus::Connected);
    assert_eq!(stored.connection.last_error, None);
}

#[tokio::test]
async fn disconnect_deletes_connection_and_credentials() {
    let h = harness();
    h.orchestrator
        .connect("u1", "hotmart", "acc-1", hotmart_creds())
        .await
        .expect("connect");
    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");

    let snapshot = h.orchestrator.disconnect(&key).await.expect("disconnect");
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(h.store.get_connection(&key).await.unwrap(), None);

    let err = h.orchestrator.disconnect(&key).await.expect_err("gone");
    assert!(matches!(err, SyncError::ConnectionNotFound(_)));
    let err = h.orchestrator.sync(&key).await.expect_err("gone");
    assert!(matches!(err, SyncError::ConnectionNotFound(_)));
}

#[tokio::test]
async fn sync_all_reports_each_account_and_tolerates_failures() {
    let h = harness();
    for account in ["a", "b", "c", "d"] {
        h.orchestrator
            .connect("u1", "hotmart", account, hotmart_creds())
            .await
            .expect("connect");
    }
    h.hotmart.set("a", Behavior::Ok { revenue_cents: 100 });
    h.hotmart.set("b", Behavior::Transient);
    h.hotmart.set("c", Behavior::Ok { revenue_cents: 300 });
    h.hotmart.set("d", Behavior::Ok { revenue_cents: 400 });

    let results = h
        .orchestrator
        .sync_all("u1", &CancellationToken::new())
        .await
        .expect("sync_all");

    assert_eq!(results.len(), 4);
    let ids: Vec<_> = results.iter().map(|r| r.account_id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c", "d"], "results keep connection order");
    assert!(matches!(
        results[1].outcome,
        SyncOutcome::Failed { retryable: true, .. }
    ));
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Synced { partial: false }))
            .count(),
        3
    );

    let records = h
        .store
        .list_records(&RecordQuery::for_user("u1"))
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn sync_all_skips_connections_that_cannot_sync() {
    let h = harness();
    h.hotmart.set("bad", Behavior::Auth);
    h.orchestrator
        .connect("u1", "hotmart", "good", hotmart_creds())
        .await
        .expect("connect");
    let _ = h
        .orchestrator
        .connect("u1", "hotmart", "bad", hotmart_creds())
        .await;

    let results = h
        .orchestrator
        .sync_all("u1", &CancellationToken::new())
        .await
        .expect("sync_all");
    let bad = results
        .iter()
        .find(|r| r.account_id == "bad")
        .expect("bad result");
    assert_eq!(
        bad.outcome,
        SyncOutcome::Skipped {
            connection_status: ConnectionStatus::Error
        }
    );
}

#[tokio::test]
async fn cancelled_sync_all_writes_nothing_for_abandoned_fetches() {
    let h = harness();
    for account in ["slow-1", "slow-2"] {
        h.orchestrator
            .connect("u1", "hotmart", account, hotmart_creds())
            .await
            .expect("connect");
        h.hotmart.set(account, Behavior::Hang);
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let results = tokio::time::timeout(
        Duration::from_secs(5),
        h.orchestrator.sync_all("u1", &cancel),
    )
    .await
    .expect("cancellation ends the batch")
    .expect("sync_all");

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.outcome == SyncOutcome::Cancelled));
    assert!(
        h.store
            .list_records(&RecordQuery::for_user("u1"))
            .await
            .unwrap()
            .is_empty()
    );
    for account in ["slow-1", "slow-2"] {
        let key = ConnectionKey::new("u1", PlatformKind::Hotmart, account);
        let stored = h.store.get_connection(&key).await.unwrap().expect("stored");
        assert_eq!(stored.connection.status, ConnectionStatus::Connected);
    }

    // An already-cancelled token short-circuits before any fetch.
    let before = h.hotmart.fetches.load(Ordering::SeqCst);
    let results = h.orchestrator.sync_all("u1", &cancel).await.expect("sync_all");
    assert!(results.iter().all(|r| r.outcome == SyncOutcome::Cancelled));
    assert_eq!(h.hotmart.fetches.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn invalid_window_is_rejected() {
    let h = harness();
    let key = ConnectionKey::new("u1", PlatformKind::Hotmart, "acc-1");
    let start = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
    let window = SyncWindow {
        start,
        end: start - ChronoDuration::hours(1),
    };
    let err = h
        .orchestrator
        .sync_window(&key, window)
        .await
        .expect_err("inverted window");
    assert!(matches!(err, SyncError::InvalidWindow(_)));
}

#[tokio::test]
async fn scheduler_sweep_syncs_every_user() {
    let h = harness();
    for user in ["u1", "u2"] {
        h.orchestrator
            .connect(user, "hotmart", "acc", hotmart_creds())
            .await
            .expect("connect");
    }
    h.hotmart.set("acc", Behavior::Ok { revenue_cents: 42 });

    let store = h.store.clone();
    let scheduler = SyncScheduler::new(Arc::new(h.orchestrator), Duration::from_secs(3600));
    scheduler.sweep(&CancellationToken::new()).await;

    for user in ["u1", "u2"] {
        let records = store.list_records(&RecordQuery::for_user(user)).await.unwrap();
        assert_eq!(records.len(), 1, "{user} synced");
    }
}

#[tokio::test]
async fn scheduler_stops_on_shutdown() {
    let h = harness();
    let shutdown = CancellationToken::new();
    let handle = SyncScheduler::new(Arc::new(h.orchestrator), Duration::from_millis(10))
        .spawn(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler exits")
        .expect("scheduler task");
}
