//! Unbounded cache with no eviction.

use super::{cacheable_copy, Cache};
use crate::types::State;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Keeps every stored state until it is deleted or the cache is cleared.
///
/// All access goes through a `RwLock`; concurrent readers do not block each
/// other.
#[derive(Debug, Default)]
pub struct ForeverCache {
    entries: RwLock<HashMap<String, State>>,
}

impl ForeverCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached URIs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Cached URIs, in arbitrary order.
    pub fn uris(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub(super) fn insert(&self, state: State) {
        self.entries.write().insert(state.uri().to_string(), state);
    }
}

impl Cache for ForeverCache {
    fn store(&self, state: &State) {
        if let Some(copy) = cacheable_copy(state) {
            self.insert(copy);
        }
    }

    fn get(&self, uri: &str) -> Option<State> {
        self.entries.read().get(uri).cloned()
    }

    fn has(&self, uri: &str) -> bool {
        self.entries.read().contains_key(uri)
    }

    fn delete(&self, uri: &str) {
        self.entries.write().remove(uri);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Body, StreamBody};
    use serde_json::json;

    const URI: &str = "https://example.org/users/1";

    #[test]
    fn test_round_trip_is_deep_copy() {
        let cache = ForeverCache::new();
        let state = State::new(URI, Body::Json(json!({"name": "Ada"})));
        cache.store(&state);

        let cached = cache.get(URI).unwrap();
        assert_eq!(cached, state);
        assert!(!std::ptr::eq(&cached, &state));
        assert!(!std::ptr::eq(cached.data().unwrap(), state.data().unwrap()));
    }

    #[test]
    fn test_reads_do_not_alias() {
        let cache = ForeverCache::new();
        cache.store(&State::new(URI, Body::Text("a".into())));
        let first = cache.get(URI).unwrap();
        let second = cache.get(URI).unwrap();
        assert!(!std::ptr::eq(first.text().unwrap(), second.text().unwrap()));
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = ForeverCache::new();
        cache.store(&State::new(URI, Body::Empty));
        cache.store(&State::new("https://example.org/other", Body::Empty));
        assert!(cache.has(URI));

        cache.delete(URI);
        assert!(!cache.has(URI));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stream_states_are_skipped() {
        let cache = ForeverCache::new();
        let state = State::new(URI, Body::Stream(StreamBody::new(futures::stream::empty())));
        cache.store(&state);
        assert!(!cache.has(URI));
        assert!(cache.get(URI).is_none());
    }
}
