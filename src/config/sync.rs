use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sync orchestrator configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Upper bound of concurrent per-account syncs inside one `sync_all` batch.
    /// TOML: `sync.max_concurrency`. Default: `8`.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Timeout applied to every adapter network call, in seconds.
    /// TOML: `sync.request_timeout_secs`. Default: `30`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Period of the background `sync_all` sweep over every user, in seconds. `0` disables it.
    /// TOML: `sync.interval_secs`. Default: `0`.
    #[serde(default)]
    pub interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SyncResolvedConfig {
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub interval: Option<Duration>,
}

impl SyncConfig {
    pub fn resolve(&self) -> SyncResolvedConfig {
        SyncResolvedConfig {
            max_concurrency: self.max_concurrency.max(1),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            interval: (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs)),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            interval_secs: 0,
        }
    }
}

impl Default for SyncResolvedConfig {
    fn default() -> Self {
        SyncConfig::default().resolve()
    }
}

fn default_max_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}
