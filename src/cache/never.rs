//! Cache that never stores anything.

use super::Cache;
use crate::types::State;

/// Disables caching: every read goes to the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCache;

impl NeverCache {
    /// Create the cache.
    pub fn new() -> Self {
        NeverCache
    }
}

impl Cache for NeverCache {
    fn store(&self, _state: &State) {}

    fn get(&self, _uri: &str) -> Option<State> {
        None
    }

    fn has(&self, _uri: &str) -> bool {
        false
    }

    fn delete(&self, _uri: &str) {}

    fn clear(&self) {}
}
