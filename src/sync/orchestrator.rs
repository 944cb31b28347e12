use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::locks::ConnectionLocks;
use super::{ConnectionEvent, ConnectionKey, ConnectionStatus, PlatformConnection, StoredConnection, can_sync};
use crate::config::SyncResolvedConfig;
use crate::error::{IsRetryable, SyncError};
use crate::providers::{
    AdapterRegistry, CallOptions, ConnectRequest, FetchRequest, NormalizedRecord,
    PlatformCredentials, PlatformKind, SyncWindow,
};
use crate::store::MetricsStore;

const MAX_RANGE_DAYS: usize = 366;

/// Outcome of one connection inside a [`SyncOrchestrator::sync_all`] batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSyncResult {
    pub platform: PlatformKind,
    pub account_id: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SyncOutcome {
    Synced {
        partial: bool,
    },
    Failed {
        code: &'static str,
        error: String,
        retryable: bool,
    },
    /// The connection was not in a syncable state.
    Skipped {
        connection_status: ConnectionStatus,
    },
    Cancelled,
}

/// Owns connection lifecycles and drives adapters into the store.
pub struct SyncOrchestrator {
    registry: AdapterRegistry,
    store: Arc<dyn MetricsStore>,
    locks: ConnectionLocks,
    cfg: SyncResolvedConfig,
}

impl SyncOrchestrator {
    pub fn new(
        registry: AdapterRegistry,
        store: Arc<dyn MetricsStore>,
        cfg: SyncResolvedConfig,
    ) -> Self {
        Self {
            registry,
            store,
            locks: ConnectionLocks::default(),
            cfg,
        }
    }

    pub fn store(&self) -> &Arc<dyn MetricsStore> {
        &self.store
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    fn call_options(&self) -> CallOptions {
        CallOptions::with_timeout(self.cfg.request_timeout)
    }

    /// Validates `credentials` remotely and stores the connection as `connected`.
    ///
    /// On failure the connection is left in `error` with the message and without credentials.
    pub async fn connect(
        &self,
        user_id: &str,
        platform_id: &str,
        account_id: &str,
        credentials: PlatformCredentials,
    ) -> Result<PlatformConnection, SyncError> {
        let adapter = self
            .registry
            .resolve(platform_id)
            .map_err(|_| SyncError::UnsupportedPlatform(platform_id.to_string()))?;
        let key = ConnectionKey::new(user_id, adapter.kind(), account_id.trim());
        let _guard = self.locks.acquire(&key).await;

        let now = Utc::now();
        let previous = self.store.get_connection(&key).await?;
        let (mut connection, previous_credentials) = match previous {
            Some(stored) => (stored.connection, stored.credentials),
            None => (PlatformConnection::new(&key, now), None),
        };

        advance(&key, &mut connection, ConnectionEvent::ConnectStarted, now)?;
        self.store
            .put_connection(&StoredConnection {
                connection: connection.clone(),
                credentials: previous_credentials,
            })
            .await?;

        let result = adapter
            .connect(ConnectRequest {
                credentials: &credentials,
                account_id: &key.account_id,
                call: self.call_options(),
            })
            .await;

        let now = Utc::now();
        match result {
            Ok(info) => {
                advance(&key, &mut connection, ConnectionEvent::ConnectSucceeded, now)?;
                connection.last_error = None;
                if info.account_name.is_some() {
                    connection.account_name = info.account_name;
                }
                self.store
                    .put_connection(&StoredConnection {
                        connection: connection.clone(),
                        credentials: Some(credentials),
                    })
                    .await?;
                info!(
                    user_id = %key.user_id,
                    platform = %key.platform,
                    account_id = %key.account_id,
                    currency = info.currency.as_deref().unwrap_or("<unknown>"),
                    "Platform connected"
                );
                Ok(connection)
            }
            Err(e) => {
                advance(&key, &mut connection, ConnectionEvent::ConnectFailed, now)?;
                connection.last_error = Some(e.to_string());
                self.store
                    .put_connection(&StoredConnection {
                        connection,
                        credentials: None,
                    })
                    .await?;
                warn!(
                    user_id = %key.user_id,
                    platform = %key.platform,
                    account_id = %key.account_id,
                    error = %e,
                    "Platform connect failed"
                );
                Err(SyncError::adapter(&key, e))
            }
        }
    }

    /// Deletes the connection and its credentials. Returns the final snapshot.
    pub async fn disconnect(&self, key: &ConnectionKey) -> Result<PlatformConnection, SyncError> {
        let _guard = self.locks.acquire(key).await;

        let stored = self
            .store
            .get_connection(key)
            .await?
            .ok_or_else(|| SyncError::ConnectionNotFound(key.clone()))?;
        let mut connection = stored.connection;
        advance(key, &mut connection, ConnectionEvent::Disconnect, Utc::now())?;

        if let (Some(adapter), Some(credentials)) =
            (self.registry.get(key.platform), stored.credentials.as_ref())
            && let Err(e) = adapter.disconnect(credentials, self.call_options()).await
        {
            warn!(platform = %key.platform, account_id = %key.account_id, error = %e, "Adapter disconnect failed");
        }

        self.store.delete_connection(key).await?;
        info!(user_id = %key.user_id, platform = %key.platform, account_id = %key.account_id, "Platform disconnected");
        Ok(connection)
    }

    /// Syncs the current UTC day.
    pub async fn sync(&self, key: &ConnectionKey) -> Result<NormalizedRecord, SyncError> {
        self.sync_window(key, SyncWindow::day_of(Utc::now())).await
    }

    /// Syncs one whole UTC day; any other window is `InvalidWindow`. Longer spans go
    /// through [`Self::sync_range`].
    pub async fn sync_window(
        &self,
        key: &ConnectionKey,
        window: SyncWindow,
    ) -> Result<NormalizedRecord, SyncError> {
        if !window.is_utc_day() {
            return Err(SyncError::InvalidWindow(format!(
                "window {} .. {} is not a single UTC day",
                window.start, window.end
            )));
        }
        self.sync_inner(key, window, None).await
    }

    /// Syncs every UTC day touched by `range`, one record per day, oldest first.
    ///
    /// Stops at the first failing day; days already synced keep their records.
    pub async fn sync_range(
        &self,
        key: &ConnectionKey,
        range: SyncWindow,
    ) -> Result<Vec<NormalizedRecord>, SyncError> {
        if range.start >= range.end {
            return Err(SyncError::InvalidWindow(format!(
                "start {} is not before end {}",
                range.start, range.end
            )));
        }
        let days: Vec<SyncWindow> = range.days().collect();
        if days.len() > MAX_RANGE_DAYS {
            return Err(SyncError::InvalidWindow(format!(
                "range spans {} days, at most {MAX_RANGE_DAYS} are allowed",
                days.len()
            )));
        }

        let mut records = Vec::with_capacity(days.len());
        for day in days {
            records.push(self.sync_inner(key, day, None).await?);
        }
        Ok(records)
    }

    /// Syncs every connection of `user_id` for the current UTC day.
    ///
    /// Per-connection failures land in their own result; only listing the user's
    /// connections can fail the batch.
    pub async fn sync_all(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<AccountSyncResult>, SyncError> {
        let connections = self.store.list_connections(user_id).await?;
        if connections.is_empty() {
            return Ok(Vec::new());
        }

        let window = SyncWindow::day_of(Utc::now());
        let bound = connections.len().min(self.cfg.max_concurrency).max(1);
        debug!(user_id, connections = connections.len(), concurrency = bound, "sync_all started");

        let mut slots: Vec<Option<AccountSyncResult>> = vec![None; connections.len()];
        let mut results = stream::iter(connections.into_iter().enumerate())
            .map(|(idx, stored)| async move { (idx, self.sync_one(stored, window, cancel).await) })
            .buffer_unordered(bound);

        while let Some((idx, result)) = results.next().await {
            slots[idx] = Some(result);
        }

        let results: Vec<AccountSyncResult> = slots.into_iter().flatten().collect();
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Failed { .. }))
            .count();
        info!(user_id, total = results.len(), failed, "sync_all finished");
        Ok(results)
    }

    pub async fn connections(&self, user_id: &str) -> Result<Vec<PlatformConnection>, SyncError> {
        Ok(self
            .store
            .list_connections(user_id)
            .await?
            .into_iter()
            .map(|s| s.connection)
            .collect())
    }

    async fn sync_one(
        &self,
        stored: StoredConnection,
        window: SyncWindow,
        cancel: &CancellationToken,
    ) -> AccountSyncResult {
        let key = stored.connection.key();
        let outcome = if cancel.is_cancelled() {
            SyncOutcome::Cancelled
        } else if !can_sync(stored.connection.status) || stored.credentials.is_none() {
            SyncOutcome::Skipped {
                connection_status: stored.connection.status,
            }
        } else {
            match self.sync_inner(&key, window, Some(cancel)).await {
                Ok(record) => SyncOutcome::Synced {
                    partial: record.metrics.partial,
                },
                Err(SyncError::Cancelled) => SyncOutcome::Cancelled,
                Err(e) => SyncOutcome::Failed {
                    code: e.code(),
                    retryable: e.is_retryable(),
                    error: e.to_string(),
                },
            }
        };
        AccountSyncResult {
            platform: key.platform,
            account_id: key.account_id,
            outcome,
        }
    }

    async fn sync_inner(
        &self,
        key: &ConnectionKey,
        window: SyncWindow,
        cancel: Option<&CancellationToken>,
    ) -> Result<NormalizedRecord, SyncError> {
        if window.start >= window.end {
            return Err(SyncError::InvalidWindow(format!(
                "start {} is not before end {}",
                window.start, window.end
            )));
        }
        let adapter = self
            .registry
            .get(key.platform)
            .ok_or_else(|| SyncError::UnsupportedPlatform(key.platform.to_string()))?;

        let _guard = self.locks.acquire(key).await;

        let stored = self
            .store
            .get_connection(key)
            .await?
            .ok_or_else(|| SyncError::ConnectionNotFound(key.clone()))?;
        let StoredConnection {
            mut connection,
            credentials,
        } = stored;
        let credentials = match credentials {
            Some(c) if can_sync(connection.status) => c,
            _ => {
                return Err(SyncError::NotConnected {
                    key: key.clone(),
                    status: connection.status,
                });
            }
        };

        let fetch = adapter.fetch_metrics(FetchRequest {
            credentials: &credentials,
            account_id: &key.account_id,
            window,
            call: self.call_options(),
        });
        // Only the remote fetch races cancellation; the writes below always complete.
        let fetched = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(platform = %key.platform, account_id = %key.account_id, "Sync cancelled during fetch");
                    return Err(SyncError::Cancelled);
                }
                r = fetch => r,
            },
            None => fetch.await,
        };

        let metrics = match fetched {
            Ok(metrics) => metrics,
            Err(e) => {
                let retryable = e.is_retryable();
                advance(key, &mut connection, ConnectionEvent::SyncFailed { retryable }, Utc::now())?;
                connection.last_error = Some(e.to_string());
                warn!(
                    user_id = %key.user_id,
                    platform = %key.platform,
                    account_id = %key.account_id,
                    retryable,
                    status = %connection.status,
                    error = %e,
                    "Platform sync failed"
                );
                self.save_connection(connection, credentials).await;
                return Err(SyncError::adapter(key, e));
            }
        };

        let now = Utc::now();
        let product_id = key
            .platform
            .product_scope_key()
            .and_then(|k| credentials.get(k))
            .map(str::to_string);
        let record = NormalizedRecord {
            user_id: key.user_id.clone(),
            platform: key.platform,
            account_id: key.account_id.clone(),
            product_id,
            timestamp: window.start,
            window_end: window.end,
            synced_at: now,
            metrics,
        };
        if record.metrics.partial {
            warn!(
                platform = %key.platform,
                account_id = %key.account_id,
                window_start = %window.start,
                "Platform returned partial data"
            );
        }

        if let Err(e) = self.store.put_record(&record).await {
            advance(key, &mut connection, ConnectionEvent::SyncFailed { retryable: false }, now)?;
            connection.last_error = Some(e.to_string());
            self.save_connection(connection, credentials).await;
            return Err(SyncError::Storage(e));
        }

        advance(key, &mut connection, ConnectionEvent::SyncSucceeded, now)?;
        connection.last_sync_at = Some(now);
        connection.last_error = None;
        self.store
            .put_connection(&StoredConnection {
                connection,
                credentials: Some(credentials),
            })
            .await?;

        info!(
            user_id = %key.user_id,
            platform = %key.platform,
            account_id = %key.account_id,
            window_start = %window.start,
            transactions = record.metrics.transaction_count,
            partial = record.metrics.partial,
            "Platform synced"
        );
        Ok(record)
    }

    /// Best effort: the caller already has a more relevant error to report.
    async fn save_connection(&self, connection: PlatformConnection, credentials: PlatformCredentials) {
        let key = connection.key();
        if let Err(e) = self
            .store
            .put_connection(&StoredConnection {
                connection,
                credentials: Some(credentials),
            })
            .await
        {
            warn!(connection = %key, error = %e, "Failed to persist connection status");
        }
    }
}

fn advance(
    key: &ConnectionKey,
    connection: &mut PlatformConnection,
    event: ConnectionEvent,
    now: DateTime<Utc>,
) -> Result<(), SyncError> {
    connection
        .apply(event, now)
        .map_err(|status| SyncError::NotConnected {
            key: key.clone(),
            status,
        })
}
