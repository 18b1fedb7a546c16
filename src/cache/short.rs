//! Cache whose entries expire a fixed time after they were stored.
//!
//! This absorbs the duplicate GETs issued while a multi-hop chain resolves
//! and gives embedded sub-resources a short window in which they can be
//! looked up by URI, without serving stale data for long.

use super::{cacheable_copy, Cache, ForeverCache};
use crate::types::State;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default lifetime of a [`ShortCache`] entry.
pub const DEFAULT_SHORT_CACHE_TIMEOUT: Duration = Duration::from_secs(30);

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// A [`ForeverCache`] with a per-URI expiry timer.
///
/// Each `store` (re)arms the timer for that URI, so the last write decides
/// when the entry expires. Timers are tokio tasks; `store` outside a tokio
/// runtime is skipped. [`Cache::destroy`] (also run on drop) aborts every
/// pending timer.
pub struct ShortCache {
    inner: Arc<ForeverCache>,
    timers: Arc<Mutex<HashMap<String, Timer>>>,
    timeout: Duration,
    generation: AtomicU64,
}

impl ShortCache {
    /// Create a cache with the default 30 second lifetime.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SHORT_CACHE_TIMEOUT)
    }

    /// Create a cache whose entries live for `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        ShortCache {
            inner: Arc::new(ForeverCache::new()),
            timers: Arc::new(Mutex::new(HashMap::new())),
            timeout,
            generation: AtomicU64::new(0),
        }
    }

    /// Create a cache whose entries live for `timeout_ms` milliseconds.
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self::with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Entry lifetime.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }

    fn cancel_all(&self) {
        for (_, timer) in self.timers.lock().drain() {
            timer.handle.abort();
        }
    }
}

impl Default for ShortCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for ShortCache {
    fn store(&self, state: &State) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("ShortCache used outside a tokio runtime; not caching {}", state.uri());
            return;
        };
        let Some(copy) = cacheable_copy(state) else {
            return;
        };

        let uri = copy.uri().to_string();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut timers = self.timers.lock();
        self.inner.insert(copy);

        let inner = Arc::clone(&self.inner);
        let timer_map = Arc::clone(&self.timers);
        let key = uri.clone();
        let timeout = self.timeout;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut timers = timer_map.lock();
            // a newer store re-armed this URI; leave its entry alone
            if timers.get(&key).map(|t| t.generation) == Some(generation) {
                timers.remove(&key);
                inner.delete(&key);
                tracing::trace!("ShortCache expired {}", key);
            }
        });

        if let Some(previous) = timers.insert(uri, Timer { generation, handle }) {
            previous.handle.abort();
        }
    }

    fn get(&self, uri: &str) -> Option<State> {
        self.inner.get(uri)
    }

    fn has(&self, uri: &str) -> bool {
        self.inner.has(uri)
    }

    fn delete(&self, uri: &str) {
        if let Some(timer) = self.timers.lock().remove(uri) {
            timer.handle.abort();
        }
        self.inner.delete(uri);
    }

    fn clear(&self) {
        self.cancel_all();
        self.inner.clear();
    }

    fn destroy(&self) {
        self.cancel_all();
    }
}

impl Drop for ShortCache {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Body;
    use tokio::time::sleep;

    const URI: &str = "https://example.org/short";

    fn state() -> State {
        State::new(URI, Body::Text("x".into()))
    }

    #[tokio::test]
    async fn test_zero_timeout_expires_after_yield() {
        let cache = ShortCache::with_timeout_ms(0);
        cache.store(&state());
        sleep(Duration::from_millis(20)).await;
        assert!(!cache.has(URI));
        assert_eq!(cache.pending_timers(), 0);
    }

    #[tokio::test]
    async fn test_entry_readable_before_expiry() {
        let cache = ShortCache::with_timeout(Duration::from_secs(5));
        cache.store(&state());
        assert_eq!(cache.get(URI).unwrap().text(), Some("x"));
    }

    #[tokio::test]
    async fn test_restore_resets_timer() {
        let cache = ShortCache::with_timeout_ms(300);
        cache.store(&state());
        sleep(Duration::from_millis(200)).await;
        cache.store(&state());
        sleep(Duration::from_millis(200)).await;
        assert!(cache.has(URI), "second store should have re-armed the timer");
        sleep(Duration::from_millis(250)).await;
        assert!(!cache.has(URI));
    }

    #[tokio::test]
    async fn test_destroy_cancels_timers() {
        let cache = ShortCache::with_timeout_ms(10);
        cache.store(&state());
        cache.destroy();
        assert_eq!(cache.pending_timers(), 0);
        sleep(Duration::from_millis(40)).await;
        assert!(cache.has(URI));
    }

    #[tokio::test]
    async fn test_delete_cancels_timer() {
        let cache = ShortCache::with_timeout(Duration::from_secs(5));
        cache.store(&state());
        cache.delete(URI);
        assert!(!cache.has(URI));
        assert_eq!(cache.pending_timers(), 0);
    }

    #[test]
    fn test_store_outside_runtime_is_skipped() {
        let cache = ShortCache::new();
        cache.store(&state());
        assert!(!cache.has(URI));
    }
}
