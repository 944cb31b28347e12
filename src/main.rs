use mimalloc::MiMalloc;
use painel::config::CONFIG;
use painel::providers::AdapterRegistry;
use painel::server::{PainelState, painel_router};
use painel::sync::{SyncOrchestrator, SyncScheduler};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &*CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let sync_cfg = cfg.sync();
    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        listen = %cfg.basic.listen,
        sync_max_concurrency = sync_cfg.max_concurrency,
        sync_request_timeout_secs = sync_cfg.request_timeout.as_secs(),
        sync_interval_secs = sync_cfg.interval.map_or(0, |d| d.as_secs()),
        "Configuration loaded"
    );

    let store = painel::db::spawn(&cfg.basic.database_url).await?;
    let registry = AdapterRegistry::from_config(cfg)?;
    let orchestrator = Arc::new(SyncOrchestrator::new(
        registry,
        Arc::new(store),
        sync_cfg.clone(),
    ));

    let shutdown = CancellationToken::new();
    let scheduler = sync_cfg.interval.map(|period| {
        SyncScheduler::new(orchestrator.clone(), period).spawn(shutdown.child_token())
    });

    let state = PainelState::new(
        orchestrator,
        Arc::from(cfg.basic.painel_key.as_str()),
        shutdown.clone(),
    );
    let app = painel_router(state);

    let listener = TcpListener::bind(cfg.basic.listen).await?;
    info!(listen = %cfg.basic.listen, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    // In-flight `sync_all` batches stop waiting on remote fetches.
    shutdown.cancel();
}
