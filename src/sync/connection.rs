use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::{ConnectionEvent, ConnectionStatus, transition};
use crate::providers::{PlatformCredentials, PlatformKind};

/// One connection per `(user_id, platform, account_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionKey {
    pub user_id: String,
    pub platform: PlatformKind,
    pub account_id: String,
}

impl ConnectionKey {
    pub fn new(
        user_id: impl Into<String>,
        platform: PlatformKind,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            platform,
            account_id: account_id.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.platform, self.account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConnection {
    pub user_id: String,
    pub platform: PlatformKind,
    pub account_id: String,
    pub account_name: Option<String>,
    pub status: ConnectionStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlatformConnection {
    pub fn new(key: &ConnectionKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            platform: key.platform,
            account_id: key.account_id.clone(),
            account_name: None,
            status: ConnectionStatus::Disconnected,
            last_sync_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.user_id.clone(), self.platform, self.account_id.clone())
    }

    /// Applies `event`, stamping `updated_at`. Rejected transitions leave `self` untouched.
    pub fn apply(&mut self, event: ConnectionEvent, now: DateTime<Utc>) -> Result<(), ConnectionStatus> {
        self.status = transition(self.status, event)?;
        self.updated_at = now;
        Ok(())
    }
}

/// A connection as persisted, with the credentials it was established with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConnection {
    pub connection: PlatformConnection,
    pub credentials: Option<PlatformCredentials>,
}
