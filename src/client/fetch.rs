//! The hypermedia client and its request pipeline.
//!
//! # Examples
//!
//! ```ignore
//! use hypermedia_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> hypermedia_client::Result<()> {
//!     let client = Client::new()?;
//!     let root = client.go("https://api.example.org/")?;
//!
//!     // GET / then GET the `me` link
//!     let me = root.follow("me").get().await?;
//!     println!("{:?}", me.data());
//!     Ok(())
//! }
//! ```
//!
//! ## Middleware
//!
//! ```ignore
//! use hypermedia_client::middleware::BearerAuth;
//!
//! client.use_middleware(BearerAuth::new("s3cr3t")?, "https://api.example.org")?;
//! ```

use crate::cache::Cache;
use crate::client::abort::{abortable, AbortSignal};
use crate::client::resource::{Resource, ResourceInner};
use crate::client::{utils, ClientConfig, RequestOptions};
use crate::error::{HypermediaError, Result};
use crate::format::{self, opaque, Format};
use crate::middleware::{AcceptHeader, Middleware, Next, OriginFilter, Registered};
use crate::protocol::{content_type_of, resolve_uri};
use crate::types::State;
use futures::future::{BoxFuture, FutureExt, Shared};
use http::{HeaderMap, Method, StatusCode};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::instrument;
use url::Url;

type SharedRefresh = Shared<BoxFuture<'static, Result<State>>>;

/// Runs requests through the middleware chain.
pub struct Fetcher {
    http: reqwest::Client,
    middlewares: RwLock<Arc<Vec<Registered>>>,
}

impl Fetcher {
    /// Create a fetcher sending through `http`, with no middleware.
    pub fn new(http: reqwest::Client) -> Self {
        Fetcher {
            http,
            middlewares: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Append `middleware` for requests whose origin matches `origin`.
    ///
    /// Requests already in flight keep the chain they started with.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>, origin: &str) -> Result<()> {
        let filter = OriginFilter::new(origin)?;
        let mut guard = self.middlewares.write();
        let mut chain = Vec::clone(&guard);
        chain.push(Registered::new(middleware, filter));
        *guard = Arc::new(chain);
        Ok(())
    }

    /// Number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        self.middlewares.read().len()
    }

    /// Send `request` through the chain.
    ///
    /// Transport failures and timeouts become
    /// [`Transport`](HypermediaError::Transport), an abort becomes
    /// [`Cancelled`](HypermediaError::Cancelled). The HTTP status is not
    /// inspected.
    #[instrument(level = "debug", skip_all, fields(method = %request.method(), url = %request.url()))]
    pub async fn fetch_or_throw(
        &self,
        request: reqwest::Request,
        signal: Option<&AbortSignal>,
    ) -> Result<reqwest::Response> {
        let chain = self.middlewares.read().clone();
        abortable(Next::new(&self.http, &chain).run(request), signal).await
    }

    /// The underlying HTTP client.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("middlewares", &self.middleware_count())
            .finish()
    }
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    fetcher: Fetcher,
    resources: Mutex<HashMap<String, Weak<ResourceInner>>>,
    inflight: Mutex<HashMap<String, SharedRefresh>>,
}

/// Entry point for navigating a hypermedia API.
///
/// Cheap to clone; clones share configuration, middleware, cache and the
/// resource registry.
///
/// # Features
///
/// - Content negotiation over HAL, JSON:API, Siren, text and binary
/// - Response caching with invalidation after mutations
/// - De-duplication of concurrent refreshes of the same URI
/// - Origin-scoped middleware
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom configuration.
    ///
    /// An [`AcceptHeader`] built from the content type table is installed as
    /// the first middleware.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90));

        if config.send_user_agent {
            builder = builder.user_agent(config.user_agent.clone());
        }

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| HypermediaError::Config(format!("invalid proxy {:?}: {}", config.proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| HypermediaError::Config(format!("failed to build HTTP client: {}", e)))?;

        let fetcher = Fetcher::new(http);
        fetcher.use_middleware(Arc::new(AcceptHeader::new(&config.content_type_map)?), "*")?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                config,
                fetcher,
                resources: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The resource at `uri`, resolved against `base_url` when relative.
    ///
    /// Returns the same resource (see [`Resource::ptr_eq`]) for the same
    /// URI as long as any handle to it is alive.
    pub fn go(&self, uri: &str) -> Result<Resource> {
        let uri = self.absolute(uri)?;
        let mut resources = self.inner.resources.lock();
        if let Some(existing) = resources.get(&uri).and_then(Weak::upgrade) {
            return Ok(Resource::from_inner(existing));
        }

        resources.retain(|_, weak| weak.strong_count() > 0);
        let inner = Arc::new(ResourceInner::new(uri.clone(), self.clone()));
        resources.insert(uri, Arc::downgrade(&inner));
        Ok(Resource::from_inner(inner))
    }

    fn absolute(&self, uri: &str) -> Result<String> {
        match &self.inner.config.base_url {
            Some(base) => resolve_uri(base, uri),
            None => Url::parse(uri)
                .map(|u| u.to_string())
                .map_err(|e| HypermediaError::InvalidUri(format!("{} ({})", uri, e))),
        }
    }

    /// Register middleware for requests whose origin matches `origin`
    /// (`*` wildcards allowed). Middleware runs in registration order.
    pub fn use_middleware(&self, middleware: impl Middleware + 'static, origin: &str) -> Result<()> {
        self.inner.fetcher.use_middleware(Arc::new(middleware), origin)
    }

    /// The request pipeline.
    pub fn fetcher(&self) -> &Fetcher {
        &self.inner.fetcher
    }

    /// The state cache.
    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.inner.config.cache
    }

    /// Drop every cached state.
    pub fn clear_cache(&self) {
        self.inner.config.cache.clear();
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same client.
    pub fn ptr_eq(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn build_request(&self, uri: &str, options: &RequestOptions) -> Result<reqwest::Request> {
        let url = Url::parse(uri).map_err(|e| HypermediaError::InvalidUri(format!("{} ({})", uri, e)))?;
        let mut request = reqwest::Request::new(options.effective_method(), url);
        request.headers_mut().extend(options.headers.clone());
        if let Some(body) = &options.body {
            *request.body_mut() = Some(reqwest::Body::from(body.clone()));
        }
        Ok(request)
    }

    /// Send a request through the middleware without interpreting the
    /// response.
    pub(crate) async fn send(
        &self,
        uri: &str,
        options: &RequestOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<reqwest::Response> {
        let request = self.build_request(uri, options)?;
        self.inner.fetcher.fetch_or_throw(request, signal).await
    }

    /// Cached state for `uri`, bound to this client.
    pub(crate) fn cached(&self, uri: &str) -> Option<State> {
        let hit = self.inner.config.cache.get(uri);
        if self.inner.config.enable_logging {
            tracing::debug!("Cache {} for {}", if hit.is_some() { "hit" } else { "miss" }, uri);
        }
        hit.map(|state| state.with_client(self.clone()))
    }

    /// Store `state` and every embedded state under their own URIs.
    pub(crate) fn cache_state(&self, state: &State) {
        let cache = &self.inner.config.cache;
        cache.store(state);
        for embedded in state.embedded_states() {
            cache.store(embedded);
        }
    }

    /// Evict everything a mutation of `target` made stale.
    pub(crate) fn invalidate(&self, target: &str, headers: &HeaderMap) {
        for uri in utils::stale_uris(target, headers) {
            if self.inner.config.enable_logging {
                tracing::debug!("Evicting {} after mutation of {}", uri, target);
            }
            self.inner.config.cache.delete(&uri);
        }
    }

    /// `GET` through the cache: a hit is returned as is, a miss is fetched.
    ///
    /// Misses without extra headers share an in-flight refresh.
    pub(crate) async fn get_state(
        &self,
        uri: &str,
        headers: &HeaderMap,
        signal: Option<&AbortSignal>,
    ) -> Result<State> {
        if let Some(state) = self.cached(uri) {
            return Ok(state);
        }
        if headers.is_empty() {
            return self.refresh(uri, signal).await;
        }
        let options = RequestOptions {
            headers: headers.clone(),
            ..RequestOptions::default()
        };
        self.request_state(uri, &options, signal).await
    }

    /// `GET` from the network, joining a refresh of the same URI that is
    /// already in flight.
    ///
    /// Aborting `signal` detaches this caller. The shared request keeps
    /// running while other callers wait on it and is dropped, cancelling the
    /// fetch, once the last one detaches.
    pub(crate) async fn refresh(&self, uri: &str, signal: Option<&AbortSignal>) -> Result<State> {
        if signal.is_some_and(AbortSignal::is_aborted) {
            return Err(HypermediaError::Cancelled);
        }
        let shared = self.shared_refresh(uri);
        let result = abortable(shared.clone(), signal).await;
        if signal.is_some_and(AbortSignal::is_aborted) {
            self.release_refresh(uri, &shared);
        }
        result
    }

    /// Forget an abandoned refresh so the next caller starts a new request.
    fn release_refresh(&self, uri: &str, shared: &SharedRefresh) {
        let mut inflight = self.inner.inflight.lock();
        let Some(existing) = inflight.get(uri) else {
            return;
        };
        // one handle in the map, one held by the caller
        if existing.ptr_eq(shared) && shared.strong_count() == Some(2) {
            inflight.remove(uri);
            if self.inner.config.enable_logging {
                tracing::debug!("Dropping abandoned refresh of {}", uri);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inflight_count(&self) -> usize {
        self.inner.inflight.lock().len()
    }

    fn shared_refresh(&self, uri: &str) -> SharedRefresh {
        let mut inflight = self.inner.inflight.lock();
        if let Some(existing) = inflight.get(uri) {
            tracing::debug!("Joining in-flight refresh of {}", uri);
            return existing.clone();
        }

        let client = self.clone();
        let key = uri.to_string();
        let refresh = async move {
            let result = client.request_state(&key, &RequestOptions::default(), None).await;
            client.inner.inflight.lock().remove(&key);
            result
        }
        .boxed()
        .shared();

        inflight.insert(uri.to_string(), refresh.clone());
        refresh
    }

    /// Send a request and parse the response.
    ///
    /// Non-2xx responses fail with [`HypermediaError::HttpStatus`]. `GET`
    /// results are cached; any other method first evicts what it made
    /// stale.
    #[instrument(level = "debug", skip(self, options, signal), fields(method = %options.effective_method()))]
    pub(crate) async fn request_state(
        &self,
        uri: &str,
        options: &RequestOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<State> {
        let method = options.effective_method();
        let response = self.send(uri, options, signal).await?;
        let response = check_status(uri, response).await?;

        if !State::is_safe(&method) {
            self.invalidate(uri, response.headers());
        }

        let state = self.parse_response(uri, &method, response, None).await?;
        if method == Method::GET {
            self.cache_state(&state);
        }
        Ok(state)
    }

    /// Send a `GET` and hand the body over as a stream. Never cached.
    pub(crate) async fn request_stream(
        &self,
        uri: &str,
        options: &RequestOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<State> {
        let response = self.send(uri, options, signal).await?;
        let response = check_status(uri, response).await?;
        self.parse_response(uri, &Method::GET, response, Some(Format::Stream)).await
    }

    async fn parse_response(
        &self,
        uri: &str,
        method: &Method,
        response: reqwest::Response,
        forced: Option<Format>,
    ) -> Result<State> {
        let no_body = *method == Method::HEAD
            || response.status() == StatusCode::NO_CONTENT
            || response.content_length() == Some(0);
        if no_body && forced.is_none() {
            let headers = response.headers().clone();
            return Ok(format::finish(opaque::empty(uri), uri, &headers).with_client(self.clone()));
        }

        let format = match forced {
            Some(format) => format,
            None => {
                let content_type = content_type_of(response.headers());
                self.inner.config.content_type_map.select(content_type.as_deref())?
            }
        };
        format.create(self, uri, response).await
    }
}

/// Turn a non-2xx response into [`HypermediaError::HttpStatus`].
async fn check_status(uri: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(HypermediaError::HttpStatus {
        status: status.as_u16(),
        uri: uri.to_string(),
        body,
    })
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("fetcher", &self.inner.fetcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NeverCache;

    #[test]
    fn test_client_creation() {
        let client = Client::new().unwrap();
        assert_eq!(client.config().request_timeout_ms, 30_000);
        // the Accept middleware is always installed
        assert_eq!(client.fetcher().middleware_count(), 1);
    }

    #[test]
    fn test_go_requires_absolute_without_base() {
        let client = Client::new().unwrap();
        assert!(matches!(client.go("/relative"), Err(HypermediaError::InvalidUri(_))));
    }

    #[test]
    fn test_go_resolves_against_base() {
        let config = ClientConfig {
            base_url: Some("https://api.example.org/v1/".into()),
            ..Default::default()
        };
        let client = Client::with_config(config).unwrap();
        assert_eq!(client.go("users").unwrap().uri(), "https://api.example.org/v1/users");
    }

    #[test]
    fn test_go_identity() {
        let client = Client::new().unwrap();
        let a = client.go("https://example.org/a").unwrap();
        let b = client.go("https://example.org/a").unwrap();
        let c = client.go("https://example.org/c").unwrap();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_go_identity_released() {
        let client = Client::new().unwrap();
        drop(client.go("https://example.org/a").unwrap());
        let _other = client.go("https://example.org/b").unwrap();
        // the dead entry for /a is pruned on the next insert
        assert_eq!(client.inner.resources.lock().len(), 1);
    }

    #[test]
    fn test_invalid_proxy_is_config_error() {
        let config = ClientConfig {
            proxy_url: "::not a url::".into(),
            ..Default::default()
        };
        assert!(matches!(Client::with_config(config), Err(HypermediaError::Config(_))));
    }

    struct Stall;

    #[async_trait::async_trait]
    impl Middleware for Stall {
        async fn handle(&self, _request: reqwest::Request, _next: Next<'_>) -> Result<reqwest::Response> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_abandoned_refresh_is_forgotten() {
        let client = Client::new().unwrap();
        client.use_middleware(Stall, "*").unwrap();
        let controller = crate::AbortController::new();
        let signal = controller.signal();

        let waiter = client.refresh("https://example.invalid/slow", Some(&signal));
        let abort = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(client.inflight_count(), 1);
            controller.abort();
        };
        let (result, _) = tokio::join!(waiter, abort);

        assert!(matches!(result, Err(HypermediaError::Cancelled)));
        assert_eq!(client.inflight_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_kept_for_remaining_waiter() {
        let client = Client::new().unwrap();
        client.use_middleware(Stall, "*").unwrap();
        let controller = crate::AbortController::new();
        let signal = controller.signal();
        let uri = "https://example.invalid/slow";

        let other = client.shared_refresh(uri);
        let waiter = client.refresh(uri, Some(&signal));
        let abort = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            controller.abort();
        };
        let (result, _) = tokio::join!(waiter, abort);

        assert!(matches!(result, Err(HypermediaError::Cancelled)));
        assert_eq!(client.inflight_count(), 1);
        drop(other);
    }

    #[test]
    fn test_build_request_applies_options() {
        let client = Client::with_config(ClientConfig::default().with_cache(NeverCache::new())).unwrap();
        let options = RequestOptions::method(Method::PATCH)
            .with_json(&serde_json::json!({"a": 1}))
            .unwrap();
        let request = client.build_request("https://example.org/x", &options).unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.headers()[http::header::CONTENT_TYPE], "application/json");
        assert!(request.body().is_some());
    }
}
