//! Relation chains.
//!
//! A [`Relation`] is a pure description of a walk through the link graph:
//! a root (a [`Resource`] or an already parsed [`State`]) followed by one
//! or more hops, each naming a rel and optionally carrying template
//! variables and a request overlay. Nothing is fetched until
//! [`get`](Relation::get), [`request`](Relation::request) or
//! [`resource`](Relation::resource) is awaited, and a relation can be
//! resolved any number of times.
//!
//! ```ignore
//! let author = client
//!     .go("https://api.example.org/")?
//!     .follow("articles")
//!     .follow_with("article", [("id", 42)])
//!     .follow("author")
//!     .get()
//!     .await?;
//! ```
//!
//! # Resolution
//!
//! Hops resolve strictly left to right; hop `i + 1` starts after hop `i`
//! completed. Every hop but the last is a `GET` that keeps the hop's
//! headers and ignores its method and body; the last hop is sent with its
//! whole overlay. A hop whose rel is embedded in
//! the current state is served from the embedded copy with no request, as
//! long as it is a plain read without variables. The first failing hop
//! fails the whole chain.

use crate::client::abort::AbortSignal;
use crate::client::{Client, RequestOptions, Resource};
use crate::error::{HypermediaError, Result};
use crate::protocol::Variables;
use crate::types::State;
use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method};
use serde_json::Value;
use std::fmt;
use tracing::instrument;

#[derive(Clone)]
enum Root {
    Resource(Resource),
    State(Box<State>),
}

#[derive(Debug, Clone)]
struct Hop {
    rel: String,
    variables: Variables,
    options: RequestOptions,
}

impl Hop {
    fn new(rel: &str, variables: Variables) -> Self {
        Hop {
            rel: rel.to_string(),
            variables,
            options: RequestOptions::default(),
        }
    }
}

/// A lazily resolved chain of link hops.
#[derive(Clone)]
pub struct Relation {
    root: Root,
    // never empty
    hops: Vec<Hop>,
    signal: Option<AbortSignal>,
}

impl Relation {
    pub(crate) fn from_resource(resource: Resource, rel: &str, variables: Variables) -> Self {
        Relation {
            root: Root::Resource(resource),
            hops: vec![Hop::new(rel, variables)],
            signal: None,
        }
    }

    pub(crate) fn from_state(state: State, rel: &str, variables: Variables) -> Self {
        Relation {
            root: Root::State(Box::new(state)),
            hops: vec![Hop::new(rel, variables)],
            signal: None,
        }
    }

    /// Append a hop.
    pub fn follow(mut self, rel: &str) -> Self {
        self.hops.push(Hop::new(rel, Variables::new()));
        self
    }

    /// Append a hop whose link is expanded with `variables`.
    pub fn follow_with<K, V>(mut self, rel: &str, variables: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let variables = variables
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.hops.push(Hop::new(rel, variables));
        self
    }

    fn last_hop(&mut self) -> &mut Hop {
        let last = self.hops.len() - 1;
        &mut self.hops[last]
    }

    /// Use `method` for the last hop.
    pub fn with_method(mut self, method: Method) -> Self {
        self.last_hop().options.method = Some(method);
        self
    }

    /// Make the last hop a `DELETE`.
    pub fn with_delete(self) -> Self {
        self.with_method(Method::DELETE)
    }

    /// Overlay `options` on the last hop.
    pub fn with_request_options(mut self, options: RequestOptions) -> Self {
        self.last_hop().options.merge(options);
        self
    }

    /// Add headers to the last hop.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.last_hop().options.merge(RequestOptions {
            headers,
            ..RequestOptions::default()
        });
        self
    }

    /// Add one header to the last hop.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.last_hop().options.headers.insert(name, value);
        self
    }

    /// Set the body of the last hop.
    pub fn with_body(mut self, body: impl Into<Bytes>, content_type: &str) -> Result<Self> {
        let options = RequestOptions::default().with_body(body, content_type)?;
        self.last_hop().options.merge(options);
        Ok(self)
    }

    /// Abort every hop of the chain when `signal` fires.
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Rels of every hop, in order.
    pub fn rels(&self) -> Vec<&str> {
        self.hops.iter().map(|h| h.rel.as_str()).collect()
    }

    fn client(&self) -> Result<Client> {
        match &self.root {
            Root::Resource(resource) => Ok(resource.client().clone()),
            Root::State(state) => state.client().cloned().ok_or_else(|| {
                HypermediaError::Config(format!("state {} is not bound to a client", state.uri()))
            }),
        }
    }

    /// Resolve the chain and return the state at its end.
    ///
    /// Without an overlay the last hop is a cache-aware `GET`. A method or
    /// body set on the last hop is sent as is; see [`request`](Self::request).
    pub async fn get(&self) -> Result<State> {
        self.request().await
    }

    /// Resolve the chain, sending the last hop with its full overlay.
    ///
    /// A plain `GET` goes through the cache. A mutating last hop bypasses it
    /// and also evicts the state it was followed from.
    #[instrument(level = "debug", skip(self), fields(rels = ?self.rels()))]
    pub async fn request(&self) -> Result<State> {
        let client = self.client()?;
        let parent = self.parent(&client).await?;
        let hop = self.terminal();
        let method = hop.options.effective_method();
        if method == Method::GET && hop.options.body.is_none() {
            return self.step(&client, parent, hop).await;
        }

        let uri = self.target(&parent, hop)?;
        let state = client
            .request_state(&uri, &hop.options, self.signal.as_ref())
            .await?;
        if !State::is_safe(&method) {
            // the parent may embed or list the mutated resource
            client.cache().delete(parent.uri());
        }
        Ok(state)
    }

    /// The resource at the end of the chain, without requesting it.
    pub async fn resource(&self) -> Result<Resource> {
        let client = self.client()?;
        let parent = self.parent(&client).await?;
        let uri = self.target(&parent, self.terminal())?;
        client.go(&uri)
    }

    fn terminal(&self) -> &Hop {
        &self.hops[self.hops.len() - 1]
    }

    /// State reached after every hop but the last.
    async fn parent(&self, client: &Client) -> Result<State> {
        let mut current = match &self.root {
            Root::Resource(resource) => {
                client
                    .get_state(resource.uri(), &HeaderMap::new(), self.signal.as_ref())
                    .await?
            }
            Root::State(state) => State::clone(state),
        };
        for hop in &self.hops[..self.hops.len() - 1] {
            current = self.step(client, current, hop).await?;
        }
        Ok(current)
    }

    /// Follow one hop from `current` as a `GET`.
    async fn step(&self, client: &Client, current: State, hop: &Hop) -> Result<State> {
        if hop.variables.is_empty() && hop.options.headers.is_empty() {
            if let Some(embedded) = current.get_embedded(&hop.rel).and_then(|e| e.first()) {
                tracing::debug!("Using embedded `{}` of {}", hop.rel, current.uri());
                return Ok(match current.client() {
                    Some(bound) => embedded.clone().with_client(bound.clone()),
                    None => embedded.clone().with_client(client.clone()),
                });
            }
        }

        let uri = self.target(&current, hop)?;
        client
            .get_state(&uri, &hop.options.headers, self.signal.as_ref())
            .await
    }

    fn target(&self, current: &State, hop: &Hop) -> Result<String> {
        current.links().require(&hop.rel)?.expand(&hop.variables)
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = match &self.root {
            Root::Resource(resource) => resource.uri(),
            Root::State(state) => state.uri(),
        };
        f.debug_struct("Relation")
            .field("root", &root)
            .field("hops", &self.hops)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Body, Embedded};
    use serde_json::json;

    fn bound_state(client: &Client) -> State {
        let mut state = State::new("https://example.invalid/users/1", Body::Json(json!({"name": "Ada"})));
        state.links_mut().add_href("friends", "/users/1/friends");
        state.add_embedded(
            "accounts",
            Embedded::Many(vec![
                State::new("https://example.invalid/accounts/1", Body::Json(json!({"n": 1}))),
                State::new("https://example.invalid/accounts/2", Body::Json(json!({"n": 2}))),
            ]),
        );
        state.with_client(client.clone())
    }

    #[test]
    fn test_overlay_applies_to_last_hop() {
        let client = Client::new().unwrap();
        let relation = bound_state(&client)
            .follow("friends")
            .with_method(Method::POST)
            .follow("best")
            .with_delete();
        assert_eq!(relation.hops[0].options.method, Some(Method::POST));
        assert_eq!(relation.hops[1].options.method, Some(Method::DELETE));
    }

    #[tokio::test]
    async fn test_embedded_hop_needs_no_network() {
        let client = Client::new().unwrap();
        let account = bound_state(&client).follow("accounts").get().await.unwrap();
        assert_eq!(account.uri(), "https://example.invalid/accounts/1");
        assert!(account.client().is_some());
    }

    #[tokio::test]
    async fn test_unknown_rel() {
        let client = Client::new().unwrap();
        match bound_state(&client).follow("nonexistent").get().await {
            Err(HypermediaError::RelationNotFound { rel, .. }) => assert_eq!(rel, "nonexistent"),
            other => panic!("unexpected {:?}", other.map(|s| s.uri().to_string())),
        }
    }

    #[tokio::test]
    async fn test_resource_of_link() {
        let client = Client::new().unwrap();
        let friends = bound_state(&client).follow("friends").resource().await.unwrap();
        assert_eq!(friends.uri(), "https://example.invalid/users/1/friends");
    }

    #[tokio::test]
    async fn test_unbound_state() {
        let state = State::new("https://example.invalid/", Body::Empty);
        assert!(matches!(
            state.follow("x").get().await,
            Err(HypermediaError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_aborted_signal_cancels() {
        let client = Client::new().unwrap();
        let controller = crate::AbortController::new();
        controller.abort();
        let result = bound_state(&client)
            .follow("friends")
            .with_signal(controller.signal())
            .get()
            .await;
        assert!(matches!(result, Err(HypermediaError::Cancelled)));
    }
}
