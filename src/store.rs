//! Storage collaborator used by the sync orchestrator and the dashboard routes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;
use crate::providers::{NormalizedRecord, PlatformKind};
use crate::sync::{ConnectionKey, StoredConnection};

/// Narrowing applied by [`MetricsStore::list_records`]. Time bounds are inclusive and
/// compare against the record's window start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub user_id: String,
    pub platform: Option<PlatformKind>,
    pub account_id: Option<String>,
    pub product_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RecordQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        record.user_id == self.user_id
            && self.platform.is_none_or(|p| record.platform == p)
            && self
                .account_id
                .as_deref()
                .is_none_or(|a| record.account_id == a)
            && self
                .product_id
                .as_deref()
                .is_none_or(|p| record.product_id.as_deref() == Some(p))
            && self.from.is_none_or(|from| record.timestamp >= from)
            && self.to.is_none_or(|to| record.timestamp <= to)
    }
}

#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Inserts or replaces the record for `(user_id, platform, account_id, timestamp)`.
    async fn put_record(&self, record: &NormalizedRecord) -> Result<(), StorageError>;

    /// Records matching `query`, ordered by window start.
    async fn list_records(&self, query: &RecordQuery)
    -> Result<Vec<NormalizedRecord>, StorageError>;

    async fn put_connection(&self, connection: &StoredConnection) -> Result<(), StorageError>;

    async fn get_connection(
        &self,
        key: &ConnectionKey,
    ) -> Result<Option<StoredConnection>, StorageError>;

    /// Removes the connection and its credentials. Returns whether a row existed.
    async fn delete_connection(&self, key: &ConnectionKey) -> Result<bool, StorageError>;

    async fn list_connections(&self, user_id: &str)
    -> Result<Vec<StoredConnection>, StorageError>;

    /// Users that own at least one connection.
    async fn list_users(&self) -> Result<Vec<String>, StorageError>;
}

type RecordKey = (String, PlatformKind, String, DateTime<Utc>);

/// In-process store. Backs tests and single-node deployments without a database.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<RecordKey, NormalizedRecord>>,
    connections: Mutex<BTreeMap<ConnectionKey, StoredConnection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn put_record(&self, record: &NormalizedRecord) -> Result<(), StorageError> {
        let key = (
            record.user_id.clone(),
            record.platform,
            record.account_id.clone(),
            record.timestamp,
        );
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, record.clone());
        Ok(())
    }

    async fn list_records(
        &self,
        query: &RecordQuery,
    ) -> Result<Vec<NormalizedRecord>, StorageError> {
        let mut out: Vec<_> = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (a.timestamp, a.platform, &a.account_id).cmp(&(b.timestamp, b.platform, &b.account_id))
        });
        Ok(out)
    }

    async fn put_connection(&self, connection: &StoredConnection) -> Result<(), StorageError> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection.connection.key(), connection.clone());
        Ok(())
    }

    async fn get_connection(
        &self,
        key: &ConnectionKey,
    ) -> Result<Option<StoredConnection>, StorageError> {
        Ok(self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn delete_connection(&self, key: &ConnectionKey) -> Result<bool, StorageError> {
        Ok(self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some())
    }

    async fn list_connections(
        &self,
        user_id: &str,
    ) -> Result<Vec<StoredConnection>, StorageError> {
        Ok(self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|c| c.connection.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<String>, StorageError> {
        let users: BTreeSet<String> = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|k| k.user_id.clone())
            .collect();
        Ok(users.into_iter().collect())
    }
}
