use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

use super::ConnectionKey;

/// Per-connection async mutexes. Operations on one key run one at a time; different keys
/// never contend beyond the short map lookup.
#[derive(Default)]
pub(crate) struct ConnectionLocks {
    inner: Mutex<AHashMap<ConnectionKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConnectionLocks {
    pub(crate) async fn acquire(&self, key: &ConnectionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody else holds are dropped so the map tracks live keys only.
            map.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            map.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
