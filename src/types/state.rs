//! The uniform parsed representation of a response.
//!
//! Every format parser produces a [`State`]: the envelope-free body, links,
//! embedded sub-states, forms and (for paged collections) collection
//! members. Embedded states are owned by value, so a state tree has no
//! cycles; the client additionally caches every embedded state under its
//! own URI.

use crate::client::{Action, Client, Relation};
use crate::error::{HypermediaError, Result};
use crate::protocol::Variables;
use crate::types::{Form, Link, Links};
use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

/// Boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A response body that is consumed as a stream.
///
/// Clones share the underlying stream; whichever clone calls
/// [`StreamBody::take`] first gets it.
#[derive(Clone)]
pub struct StreamBody {
    inner: Arc<Mutex<Option<ByteStream>>>,
}

impl StreamBody {
    /// Wrap a chunk stream.
    pub fn new(stream: impl Stream<Item = Result<Bytes>> + Send + 'static) -> Self {
        StreamBody {
            inner: Arc::new(Mutex::new(Some(Box::pin(stream)))),
        }
    }

    /// Take the stream. Returns `None` if it was already taken.
    pub fn take(&self) -> Option<ByteStream> {
        self.inner.lock().take()
    }

    /// Whether the stream was already taken.
    pub fn is_taken(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl fmt::Debug for StreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBody")
            .field("taken", &self.is_taken())
            .finish()
    }
}

impl PartialEq for StreamBody {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Body of a [`State`].
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body (204 responses, HEAD requests).
    Empty,
    /// JSON data with the format envelope stripped.
    Json(Value),
    /// Text body.
    Text(String),
    /// Opaque binary body.
    Binary(Bytes),
    /// Streaming body, never cached.
    Stream(StreamBody),
}

/// Embedded sub-states under one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    /// The format declared a single embedded resource.
    One(State),
    /// The format declared a list of embedded resources.
    Many(Vec<State>),
}

impl Embedded {
    /// All states, regardless of cardinality.
    pub fn as_slice(&self) -> &[State] {
        match self {
            Embedded::One(state) => std::slice::from_ref(state),
            Embedded::Many(states) => states,
        }
    }

    /// The first state, if any.
    pub fn first(&self) -> Option<&State> {
        self.as_slice().first()
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether there are no states.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Whether the format declared a single resource.
    pub fn is_one(&self) -> bool {
        matches!(self, Embedded::One(_))
    }

    fn push(&mut self, state: State) {
        match self {
            Embedded::Many(states) => states.push(state),
            Embedded::One(existing) => {
                let first = existing.clone();
                *self = Embedded::Many(vec![first, state]);
            }
        }
    }

    fn map_states(&self, f: &impl Fn(&State) -> Result<State>) -> Result<Embedded> {
        Ok(match self {
            Embedded::One(state) => Embedded::One(f(state)?),
            Embedded::Many(states) => {
                Embedded::Many(states.iter().map(f).collect::<Result<Vec<_>>>()?)
            }
        })
    }
}

/// A parsed representation of a resource.
#[derive(Clone)]
pub struct State {
    uri: String,
    body: Body,
    links: Links,
    embedded: BTreeMap<String, Embedded>,
    forms: BTreeMap<String, Vec<Form>>,
    collection: Vec<State>,
    headers: HeaderMap,
    content_type: Option<String>,
    timestamp: SystemTime,
    client: Option<Client>,
}

impl State {
    /// Create a state with no links, forms or embedded resources.
    pub fn new(uri: impl Into<String>, body: Body) -> Self {
        let uri = uri.into();
        State {
            links: Links::new(uri.clone()),
            uri,
            body,
            embedded: BTreeMap::new(),
            forms: BTreeMap::new(),
            collection: Vec::new(),
            headers: HeaderMap::new(),
            content_type: None,
            timestamp: SystemTime::now(),
            client: None,
        }
    }

    /// Replace the link store.
    pub fn with_links(mut self, links: Links) -> Self {
        self.links = links;
        self
    }

    /// Set the response headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the normalized content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Bind to a client so `follow` and `action` can issue requests.
    pub fn with_client(mut self, client: Client) -> Self {
        self.bind(&client);
        self
    }

    pub(crate) fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }

    pub(crate) fn add_embedded(&mut self, rel: impl Into<String>, embedded: Embedded) {
        let rel = rel.into();
        match (self.embedded.get_mut(&rel), embedded) {
            (Some(existing), Embedded::One(state)) => existing.push(state),
            (Some(existing), Embedded::Many(states)) => {
                for state in states {
                    existing.push(state);
                }
            }
            (None, embedded) => {
                self.embedded.insert(rel, embedded);
            }
        }
    }

    pub(crate) fn add_form(&mut self, form: Form) {
        self.forms.entry(form.rel.clone()).or_default().push(form);
    }

    pub(crate) fn set_collection(&mut self, collection: Vec<State>) {
        self.collection = collection;
    }

    pub(crate) fn bind(&mut self, client: &Client) {
        self.client = Some(client.clone());
        for embedded in self.embedded.values_mut() {
            match embedded {
                Embedded::One(state) => state.bind(client),
                Embedded::Many(states) => states.iter_mut().for_each(|s| s.bind(client)),
            }
        }
        self.collection.iter_mut().for_each(|s| s.bind(client));
    }

    /// Absolute URI of the resource.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// JSON data, if the body is JSON.
    pub fn data(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Deserialize the JSON data into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self
            .data()
            .ok_or_else(|| HypermediaError::malformed("body", "representation has no JSON data"))?;
        serde_json::from_value(value.clone())
            .map_err(|e| HypermediaError::malformed("body", e.to_string()))
    }

    /// Text body, if the body is text.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Binary body, if the body is binary.
    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Take the body stream, if the body is a stream that was not taken yet.
    pub fn take_stream(&self) -> Option<ByteStream> {
        match &self.body {
            Body::Stream(stream) => stream.take(),
            _ => None,
        }
    }

    /// The link store.
    pub fn links(&self) -> &Links {
        &self.links
    }

    /// First link with this rel.
    pub fn get_link(&self, rel: &str) -> Option<&Link> {
        self.links.get(rel)
    }

    /// Whether a link with this rel exists.
    pub fn has_link(&self, rel: &str) -> bool {
        self.links.has(rel)
    }

    /// Embedded states under `rel`.
    pub fn get_embedded(&self, rel: &str) -> Option<&Embedded> {
        self.embedded.get(rel)
    }

    /// Every embedded relation.
    pub fn embedded(&self) -> &BTreeMap<String, Embedded> {
        &self.embedded
    }

    /// Every embedded state, depth-first, including nested ones.
    pub fn embedded_states(&self) -> Vec<&State> {
        let mut out = Vec::new();
        for embedded in self.embedded.values() {
            for state in embedded.as_slice() {
                out.push(state);
                out.extend(state.embedded_states());
            }
        }
        out
    }

    /// Collection members. Empty unless the format's collection rule matched.
    pub fn collection(&self) -> &[State] {
        &self.collection
    }

    /// Every form, keyed by relation.
    pub fn forms(&self) -> &BTreeMap<String, Vec<Form>> {
        &self.forms
    }

    /// Form registered under `rel` with the given method (case-insensitive).
    pub fn get_form(&self, rel: &str, method: &str) -> Result<&Form> {
        let forms = self
            .forms
            .get(rel)
            .ok_or_else(|| HypermediaError::relation_not_found(rel, self.uri.clone()))?;
        forms
            .iter()
            .find(|f| f.method.as_str().eq_ignore_ascii_case(method))
            .ok_or_else(|| HypermediaError::ActionNotFound(format!("{} ({})", rel, method)))
    }

    fn find_form(&self, name: &str) -> Option<&Form> {
        self.forms.values().flatten().find(|f| f.name == name)
    }

    /// Whether a form with this name exists.
    pub fn has_action(&self, name: &str) -> bool {
        self.find_form(name).is_some()
    }

    /// The named form, ready to submit.
    pub fn action(&self, name: &str) -> Result<Action> {
        let form = self
            .find_form(name)
            .ok_or_else(|| HypermediaError::ActionNotFound(name.to_string()))?;
        Ok(Action::new(form.clone(), self.client.clone()).with_source(self.uri.clone()))
    }

    /// Every form, ready to submit.
    pub fn actions(&self) -> Vec<Action> {
        self.forms
            .values()
            .flatten()
            .map(|f| Action::new(f.clone(), self.client.clone()).with_source(self.uri.clone()))
            .collect()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A response header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Normalized content type of the response.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// When the state was parsed.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Client this state is bound to.
    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    /// Navigate from this state along `rel`.
    pub fn follow(&self, rel: &str) -> Relation {
        Relation::from_state(self.clone(), rel, Variables::new())
    }

    /// Navigate from this state along `rel`, expanding templated links with
    /// `variables`.
    pub fn follow_with<K, V>(&self, rel: &str, variables: impl IntoIterator<Item = (K, V)>) -> Relation
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let variables = variables
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Relation::from_state(self.clone(), rel, variables)
    }

    /// Deep copy without the client binding, for storing in a cache.
    ///
    /// Fails for stream bodies, which cannot be replayed.
    pub fn clone_for_cache(&self) -> Result<State> {
        if let Body::Stream(_) = self.body {
            return Err(HypermediaError::Config(format!(
                "stream body of {} cannot be cached",
                self.uri
            )));
        }
        let embedded = self
            .embedded
            .iter()
            .map(|(rel, e)| Ok((rel.clone(), e.map_states(&State::clone_for_cache)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let collection = self
            .collection
            .iter()
            .map(State::clone_for_cache)
            .collect::<Result<Vec<_>>>()?;

        Ok(State {
            uri: self.uri.clone(),
            body: self.body.clone(),
            links: self.links.clone(),
            embedded,
            forms: self.forms.clone(),
            collection,
            headers: self.headers.clone(),
            content_type: self.content_type.clone(),
            timestamp: self.timestamp,
            client: None,
        })
    }

    /// Serialize the body for a PUT of this state.
    pub fn serialize_body(&self) -> Result<(Bytes, Option<String>)> {
        match &self.body {
            Body::Empty => Ok((Bytes::new(), None)),
            Body::Json(value) => {
                let bytes = serde_json::to_vec(value)
                    .map_err(|e| HypermediaError::malformed("body", e.to_string()))?;
                let content_type = self
                    .content_type
                    .clone()
                    .unwrap_or_else(|| crate::types::form::JSON.to_string());
                Ok((Bytes::from(bytes), Some(content_type)))
            }
            Body::Text(text) => Ok((
                Bytes::from(text.clone()),
                Some(self.content_type.clone().unwrap_or_else(|| "text/plain".into())),
            )),
            Body::Binary(bytes) => Ok((bytes.clone(), self.content_type.clone())),
            Body::Stream(_) => Err(HypermediaError::Config(
                "stream bodies cannot be re-sent".into(),
            )),
        }
    }

    /// Whether a request with this method is a plain read.
    pub(crate) fn is_safe(method: &Method) -> bool {
        *method == Method::GET || *method == Method::HEAD
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
            && self.body == other.body
            && self.links == other.links
            && self.embedded == other.embedded
            && self.forms == other.forms
            && self.collection == other.collection
            && self.headers == other.headers
            && self.content_type == other.content_type
            && self.timestamp == other.timestamp
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("uri", &self.uri)
            .field("body", &self.body)
            .field("links", &self.links)
            .field("embedded", &self.embedded)
            .field("forms", &self.forms)
            .field("collection", &self.collection.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}
