//! Bounded cache evicting the least recently used URI.

use super::{cacheable_copy, Cache};
use crate::types::State;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Keeps at most `capacity` states; storing beyond that evicts the entry
/// that was read or written longest ago.
pub struct LruCache {
    entries: Mutex<lru::LruCache<String, State>>,
}

impl LruCache {
    /// Create a cache holding at most `capacity` states (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        LruCache {
            entries: Mutex::new(lru::LruCache::new(capacity)),
        }
    }

    /// Number of cached URIs.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Cache for LruCache {
    fn store(&self, state: &State) {
        if let Some(copy) = cacheable_copy(state) {
            let uri = copy.uri().to_string();
            let displaced = self.entries.lock().push(uri.clone(), copy);
            // push also hands back the previous value when the key was present
            if let Some((evicted, _)) = displaced.filter(|(k, _)| *k != uri) {
                tracing::debug!("LRU cache evicted {}", evicted);
            }
        }
    }

    fn get(&self, uri: &str) -> Option<State> {
        self.entries.lock().get(uri).cloned()
    }

    fn has(&self, uri: &str) -> bool {
        self.entries.lock().contains(uri)
    }

    fn delete(&self, uri: &str) {
        self.entries.lock().pop(uri);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Body;

    fn state(path: &str) -> State {
        State::new(format!("https://example.org{}", path), Body::Empty)
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruCache::new(2);
        cache.store(&state("/a"));
        cache.store(&state("/b"));
        // touch /a so /b becomes the eviction candidate
        assert!(cache.get("https://example.org/a").is_some());
        cache.store(&state("/c"));

        assert!(cache.has("https://example.org/a"));
        assert!(!cache.has("https://example.org/b"));
        assert!(cache.has("https://example.org/c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = LruCache::new(0);
        cache.store(&state("/a"));
        cache.store(&state("/b"));
        assert_eq!(cache.len(), 1);
        assert!(cache.has("https://example.org/b"));
    }

    #[test]
    fn test_delete() {
        let cache = LruCache::new(4);
        cache.store(&state("/a"));
        cache.delete("https://example.org/a");
        assert!(cache.is_empty());
    }
}
