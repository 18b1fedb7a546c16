//! Response caches.
//!
//! A [`Cache`] maps absolute URIs to parsed [`State`]s. Implementations
//! store a deep, client-detached copy ([`State::clone_for_cache`]) and hand
//! out fresh clones on read, so no caller can alias cached memory.
//!
//! | Type | Eviction |
//! |------|----------|
//! | [`ForeverCache`] | never (explicit `delete`/`clear` only) |
//! | [`ShortCache`] | per-URI timer, 30 s by default |
//! | [`LruCache`] | least-recently-used beyond a capacity |
//! | [`NeverCache`] | stores nothing |
//!
//! # Examples
//!
//! ```
//! use hypermedia_client::cache::{Cache, ForeverCache};
//! use hypermedia_client::{Body, State};
//!
//! let cache = ForeverCache::new();
//! let state = State::new("https://example.org/", Body::Text("hi".into()));
//! cache.store(&state);
//!
//! let cached = cache.get("https://example.org/").unwrap();
//! assert_eq!(cached.text(), Some("hi"));
//! ```

mod forever;
mod lru;
mod never;
mod short;

pub use self::forever::ForeverCache;
pub use self::lru::LruCache;
pub use self::never::NeverCache;
pub use self::short::{ShortCache, DEFAULT_SHORT_CACHE_TIMEOUT};

use crate::types::State;

/// URI-keyed store of parsed representations.
///
/// Caches are shared between every task using a client, so all methods take
/// `&self`. Failures inside a cache (for example a state whose body cannot
/// be cloned) must be contained: `store` silently skips and `get` reports a
/// miss.
pub trait Cache: Send + Sync {
    /// Store a copy of `state` under its URI.
    fn store(&self, state: &State);

    /// A fresh copy of the state cached under `uri`.
    fn get(&self, uri: &str) -> Option<State>;

    /// Whether `uri` is cached.
    fn has(&self, uri: &str) -> bool;

    /// Remove `uri`.
    fn delete(&self, uri: &str);

    /// Remove everything.
    fn clear(&self);

    /// Release background resources such as timers.
    fn destroy(&self) {}
}

/// Copy a state for storage, logging and skipping uncacheable ones.
pub(crate) fn cacheable_copy(state: &State) -> Option<State> {
    match state.clone_for_cache() {
        Ok(copy) => Some(copy),
        Err(e) => {
            tracing::warn!("Not caching {}: {}", state.uri(), e);
            None
        }
    }
}
