use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "connecting" => Ok(ConnectionStatus::Connecting),
            "connected" => Ok(ConnectionStatus::Connected),
            "error" => Ok(ConnectionStatus::Error),
            other => Err(format!("unknown connection status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    ConnectStarted,
    ConnectSucceeded,
    ConnectFailed,
    SyncSucceeded,
    /// `retryable` failures leave the status untouched.
    SyncFailed { retryable: bool },
    Disconnect,
}

/// Next status for `event`, or `Err(from)` when the transition is not allowed.
pub fn transition(
    from: ConnectionStatus,
    event: ConnectionEvent,
) -> Result<ConnectionStatus, ConnectionStatus> {
    use ConnectionEvent as E;
    use ConnectionStatus as S;

    match (from, event) {
        // A stale `connecting` left by an interrupted attempt may be retried.
        (_, E::ConnectStarted) => Ok(S::Connecting),
        (S::Connecting, E::ConnectSucceeded) => Ok(S::Connected),
        (S::Connecting, E::ConnectFailed) => Ok(S::Error),
        (S::Connected | S::Error, E::SyncSucceeded) => Ok(S::Connected),
        (S::Connected | S::Error, E::SyncFailed { retryable: true }) => Ok(from),
        (S::Connected | S::Error, E::SyncFailed { retryable: false }) => Ok(S::Error),
        (S::Connecting | S::Connected | S::Error, E::Disconnect) => Ok(S::Disconnected),
        _ => Err(from),
    }
}

/// Whether a sync may start from `status`.
pub fn can_sync(status: ConnectionStatus) -> bool {
    transition(status, ConnectionEvent::SyncSucceeded).is_ok()
}
