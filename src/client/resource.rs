//! Resources: URIs bound to a client.

use crate::client::abort::AbortSignal;
use crate::client::{utils, Client, Relation, RequestOptions};
use crate::error::{HypermediaError, Result};
use crate::protocol::Variables;
use crate::types::{Link, State};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub(crate) struct ResourceInner {
    uri: String,
    client: Client,
}

impl ResourceInner {
    pub(crate) fn new(uri: String, client: Client) -> Self {
        ResourceInner { uri, client }
    }
}

/// A URI bound to a [`Client`].
///
/// Resources are obtained from [`Client::go`] and are cheap to clone. All
/// reads go through the client's cache; mutations evict stale entries.
///
/// | Method | Request | Cache |
/// |--------|---------|-------|
/// | [`get`](Self::get) | `GET` on miss | read, then store |
/// | [`refresh`](Self::refresh) | `GET` | store |
/// | [`head`](Self::head) | `HEAD` | untouched |
/// | [`get_stream`](Self::get_stream) | `GET` | untouched |
/// | [`put`](Self::put), [`post`](Self::post), [`patch`](Self::patch), [`delete`](Self::delete) | as named | evict |
/// | [`put_state`](Self::put_state) | `PUT` | evict, then store the sent state |
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    pub(crate) fn from_inner(inner: Arc<ResourceInner>) -> Self {
        Resource { inner }
    }

    /// Absolute URI.
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// Client the resource is bound to.
    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Whether both handles are the same resource.
    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Start a relation chain at this resource.
    pub fn follow(&self, rel: &str) -> Relation {
        Relation::from_resource(self.clone(), rel, Variables::new())
    }

    /// Start a relation chain, expanding the link with `variables`.
    pub fn follow_with<K, V>(&self, rel: &str, variables: impl IntoIterator<Item = (K, V)>) -> Relation
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let variables = variables
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Relation::from_resource(self.clone(), rel, variables)
    }

    /// One resource per link under `rel`.
    pub async fn follow_all(&self, rel: &str) -> Result<Vec<Resource>> {
        let state = self.get().await?;
        let links = state.links().get_many(rel);
        if links.is_empty() {
            return Err(HypermediaError::relation_not_found(rel, self.uri()));
        }
        links
            .into_iter()
            .map(|link| self.client().go(&link.resolve()?))
            .collect()
    }

    /// Current state, from the cache when present.
    pub async fn get(&self) -> Result<State> {
        self.client().get_state(self.uri(), &HeaderMap::new(), None).await
    }

    /// Current state, abortable through `signal`.
    pub async fn get_with_signal(&self, signal: &AbortSignal) -> Result<State> {
        self.client()
            .get_state(self.uri(), &HeaderMap::new(), Some(signal))
            .await
    }

    /// Fetch from the network, bypassing the cache.
    ///
    /// Concurrent refreshes of one URI share a single request.
    pub async fn refresh(&self) -> Result<State> {
        self.client().refresh(self.uri(), None).await
    }

    /// `HEAD`: headers and `Link` header links only.
    pub async fn head(&self) -> Result<State> {
        self.request(RequestOptions::method(Method::HEAD)).await
    }

    /// `GET` with the body exposed as a chunk stream. Never cached.
    pub async fn get_stream(&self) -> Result<State> {
        self.client()
            .request_stream(self.uri(), &RequestOptions::new(), None)
            .await
    }

    /// `PUT` a JSON body.
    pub async fn put<T: Serialize + ?Sized>(&self, body: &T) -> Result<State> {
        self.request(RequestOptions::method(Method::PUT).with_json(body)?).await
    }

    /// `PUT` a state's body and store that state as the cached
    /// representation.
    ///
    /// The state must describe this resource; one parsed from another URI
    /// is rejected before anything is sent.
    pub async fn put_state(&self, state: &State) -> Result<()> {
        if state.uri() != self.uri() {
            return Err(HypermediaError::Validation(format!(
                "cannot put state of {} to {}",
                state.uri(),
                self.uri()
            )));
        }
        let (body, content_type) = state.serialize_body()?;
        let mut options = RequestOptions::method(Method::PUT);
        if let Some(content_type) = content_type {
            let value = HeaderValue::from_str(&content_type)
                .map_err(|e| HypermediaError::Config(format!("invalid content type: {}", e)))?;
            options = options.with_header(CONTENT_TYPE, value);
        }
        options.body = Some(body);

        self.request(options).await?;
        self.client().cache().store(state);
        Ok(())
    }

    /// `POST` a JSON body.
    pub async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<State> {
        self.request(RequestOptions::method(Method::POST).with_json(body)?).await
    }

    /// `POST` a JSON body and return the resource named by `Location`.
    pub async fn post_follow<T: Serialize + ?Sized>(&self, body: &T) -> Result<Resource> {
        let state = self.post(body).await?;
        match utils::location(state.headers(), self.uri())? {
            Some(location) => self.client().go(&location),
            None => Err(HypermediaError::malformed("Location", "response has no Location header")),
        }
    }

    /// `PATCH` a JSON body.
    pub async fn patch<T: Serialize + ?Sized>(&self, body: &T) -> Result<State> {
        self.request(RequestOptions::method(Method::PATCH).with_json(body)?).await
    }

    /// `DELETE`.
    pub async fn delete(&self) -> Result<State> {
        self.request(RequestOptions::method(Method::DELETE)).await
    }

    /// Any request, parsed into a state.
    pub async fn request(&self, options: RequestOptions) -> Result<State> {
        self.client().request_state(self.uri(), &options, None).await
    }

    /// Any request through the middleware, returning the raw response.
    ///
    /// The status is not checked and the cache is not touched.
    pub async fn fetch(&self, options: RequestOptions) -> Result<reqwest::Response> {
        self.client().send(self.uri(), &options, None).await
    }

    /// First link under `rel` in the current state.
    pub async fn link(&self, rel: &str) -> Result<Link> {
        let state = self.get().await?;
        state.links().require(rel).cloned()
    }

    /// Links of the current state, all of them or only those under `rel`.
    pub async fn links(&self, rel: Option<&str>) -> Result<Vec<Link>> {
        let state = self.get().await?;
        Ok(match rel {
            Some(rel) => state.links().get_many(rel).into_iter().cloned().collect(),
            None => state.links().get_all().to_vec(),
        })
    }

    /// Evict this resource from the cache.
    pub fn clear_cache(&self) {
        self.client().cache().delete(self.uri());
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("uri", &self.uri()).finish()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.uri() == other.uri() && self.client().ptr_eq(other.client())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Body;
    use serde_json::json;

    #[test]
    fn test_follow_builds_relation_without_io() {
        let client = Client::new().unwrap();
        let root = client.go("https://example.org/").unwrap();
        let relation = root.follow("me").follow("accounts");
        assert_eq!(relation.rels(), vec!["me", "accounts"]);
    }

    #[test]
    fn test_clear_cache() {
        let client = Client::new().unwrap();
        let resource = client.go("https://example.org/x").unwrap();
        client
            .cache()
            .store(&State::new("https://example.org/x", Body::Json(json!({}))));
        assert!(client.cache().has(resource.uri()));
        resource.clear_cache();
        assert!(!client.cache().has(resource.uri()));
    }

    #[tokio::test]
    async fn test_put_state_rejects_foreign_state() {
        let client = Client::new().unwrap();
        let resource = client.go("https://example.invalid/a").unwrap();
        let other = State::new("https://example.invalid/b", Body::Json(json!({"v": 1})));

        let result = resource.put_state(&other).await;

        assert!(matches!(result, Err(HypermediaError::Validation(_))));
        assert!(!client.cache().has("https://example.invalid/a"));
        assert!(!client.cache().has("https://example.invalid/b"));
    }

    #[tokio::test]
    async fn test_get_served_from_cache() {
        let client = Client::new().unwrap();
        let resource = client.go("https://example.invalid/cached").unwrap();
        client
            .cache()
            .store(&State::new(resource.uri(), Body::Text("hello".into())));

        let state = resource.get().await.unwrap();
        assert_eq!(state.text(), Some("hello"));
        assert!(state.client().unwrap().ptr_eq(&client));
    }
}
