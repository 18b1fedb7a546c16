//! Response formats and content negotiation.
//!
//! A [`Format`] turns a response into a [`State`]. Which format handles a
//! response is decided only by its `Content-Type`, looked up in a
//! [`ContentTypeMap`]; documents are never sniffed by shape.
//!
//! # Default table
//!
//! | Content type | Format | Quality |
//! |--------------|--------|---------|
//! | `application/prs.hal-forms+json` | [`Format::Hal`] | 1.0 |
//! | `application/hal+json` | [`Format::Hal`] | 0.9 |
//! | `application/vnd.api+json` | [`Format::JsonApi`] | 0.8 |
//! | `application/vnd.siren+json` | [`Format::Siren`] | 0.8 |
//! | `application/json` | [`Format::Hal`] | 0.7 |
//! | `text/*` | [`Format::Text`] | 0.2 |
//! | `*/*` | [`Format::Binary`] | 0.1 |
//!
//! The same table produces the `Accept` header sent with every request.
//!
//! # Examples
//!
//! ```
//! use hypermedia_client::format::{ContentTypeMap, Format};
//!
//! let map = ContentTypeMap::default();
//! assert_eq!(map.select(Some("application/hal+json; charset=utf-8")).unwrap(), Format::Hal);
//! assert_eq!(map.select(Some("text/csv")).unwrap(), Format::Text);
//! assert!(map.accept_header().starts_with("application/prs.hal-forms+json;q=1.0"));
//! ```

pub mod hal;
pub mod jsonapi;
pub mod opaque;
pub mod siren;

use crate::client::Client;
use crate::error::{HypermediaError, Result};
use crate::protocol::{content_type_of, format_media_range, links_from_headers, normalize_content_type};
use crate::types::State;
use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;

/// A representation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// HAL and HAL-FORMS (`_links`, `_embedded`, `_templates`).
    Hal,
    /// JSON:API (`data`, `links`).
    JsonApi,
    /// Siren (`properties`, `links`, `entities`, `actions`).
    Siren,
    /// Opaque bytes.
    Binary,
    /// Opaque bytes, delivered as a chunk stream.
    Stream,
    /// Opaque text.
    Text,
}

impl Format {
    /// Parse `response` into a state bound to `client`.
    ///
    /// [`Format::Stream`] hands the body over without reading it; every other
    /// format buffers the body first.
    pub async fn create(&self, client: &Client, uri: &str, response: reqwest::Response) -> Result<State> {
        let headers = response.headers().clone();
        let state = match self {
            Format::Stream => finish(opaque::stream(uri, response), uri, &headers),
            _ => {
                let body = response.bytes().await?;
                self.parse(uri, &headers, body)?
            }
        };
        Ok(state.with_client(client.clone()))
    }

    /// Parse a buffered body.
    ///
    /// JSON formats treat an empty body as an empty representation, so a
    /// `204` still yields a state with its `Link` header links.
    pub fn parse(&self, uri: &str, headers: &HeaderMap, body: Bytes) -> Result<State> {
        let state = match self {
            Format::Hal | Format::JsonApi | Format::Siren if body.is_empty() => opaque::empty(uri),
            Format::Hal => hal::parse(uri, decode_json(&body)?)?,
            Format::JsonApi => jsonapi::parse(uri, decode_json(&body)?)?,
            Format::Siren => siren::parse(uri, decode_json(&body)?)?,
            Format::Text => opaque::text(uri, body),
            Format::Binary | Format::Stream => opaque::binary(uri, body),
        };
        Ok(finish(state, uri, headers))
    }
}

fn decode_json(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| HypermediaError::malformed("body", e.to_string()))
}

/// Attach response metadata shared by every format.
pub(crate) fn finish(mut state: State, uri: &str, headers: &HeaderMap) -> State {
    state.links_mut().add_many(links_from_headers(headers, uri));
    let state = state.with_headers(headers.clone());
    match content_type_of(headers) {
        Some(content_type) => state.with_content_type(content_type),
        None => state,
    }
}

/// One row of a [`ContentTypeMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTypeEntry {
    /// Normalized media type; `type/*` and `*/*` act as wildcards.
    pub content_type: String,
    /// Format handling matching responses.
    pub format: Format,
    /// Preference weight in `[0, 1]`.
    pub quality: f32,
}

impl ContentTypeEntry {
    fn matches(&self, content_type: &str) -> bool {
        if self.content_type == "*/*" || self.content_type == content_type {
            return true;
        }
        match self.content_type.strip_suffix("/*") {
            Some(major) => content_type
                .split_once('/')
                .is_some_and(|(ct_major, _)| ct_major == major),
            None => false,
        }
    }
}

/// Registry from content type to [`Format`] with a quality weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTypeMap {
    entries: Vec<ContentTypeEntry>,
}

impl ContentTypeMap {
    /// An empty table. Every selection fails until entries are registered.
    pub fn empty() -> Self {
        ContentTypeMap { entries: Vec::new() }
    }

    /// Register `content_type`, replacing an existing entry for it.
    pub fn register(&mut self, content_type: &str, format: Format, quality: f32) {
        let content_type = normalize_content_type(content_type);
        let entry = ContentTypeEntry {
            content_type: content_type.clone(),
            format,
            quality: quality.clamp(0.0, 1.0),
        };
        match self.entries.iter_mut().find(|e| e.content_type == content_type) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, content_type: &str, format: Format, quality: f32) -> Self {
        self.register(content_type, format, quality);
        self
    }

    /// Remove the entry for `content_type`.
    pub fn remove(&mut self, content_type: &str) {
        let content_type = normalize_content_type(content_type);
        self.entries.retain(|e| e.content_type != content_type);
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Registered entries in registration order.
    pub fn entries(&self) -> &[ContentTypeEntry] {
        &self.entries
    }

    /// Pick the format for a response content type.
    ///
    /// The highest-quality entry matching exactly or by wildcard wins; on a
    /// tie the earlier registration wins. A missing content type is treated
    /// as `application/octet-stream`.
    pub fn select(&self, content_type: Option<&str>) -> Result<Format> {
        let content_type = content_type
            .map(normalize_content_type)
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut best: Option<&ContentTypeEntry> = None;
        for entry in self.entries.iter().filter(|e| e.matches(&content_type)) {
            if best.map_or(true, |b| entry.quality > b.quality) {
                best = Some(entry);
            }
        }

        best.map(|e| e.format)
            .ok_or(HypermediaError::UnsupportedMediaType(content_type))
    }

    /// `Accept` header value listing every entry by descending quality.
    pub fn accept_header(&self) -> String {
        let mut entries: Vec<&ContentTypeEntry> = self.entries.iter().collect();
        // stable sort keeps registration order among equal weights
        entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));
        entries
            .iter()
            .map(|e| format_media_range(&e.content_type, e.quality))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ContentTypeMap {
    fn default() -> Self {
        ContentTypeMap::empty()
            .with("application/prs.hal-forms+json", Format::Hal, 1.0)
            .with("application/hal+json", Format::Hal, 0.9)
            .with("application/vnd.api+json", Format::JsonApi, 0.8)
            .with("application/vnd.siren+json", Format::Siren, 0.8)
            .with("application/json", Format::Hal, 0.7)
            .with("text/*", Format::Text, 0.2)
            .with("*/*", Format::Binary, 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Body;
    use http::HeaderValue;

    #[test]
    fn test_select_exact_beats_wildcard() {
        let map = ContentTypeMap::default();
        assert_eq!(map.select(Some("application/vnd.siren+json")).unwrap(), Format::Siren);
        assert_eq!(map.select(Some("application/json")).unwrap(), Format::Hal);
        assert_eq!(map.select(Some("image/png")).unwrap(), Format::Binary);
        assert_eq!(map.select(None).unwrap(), Format::Binary);
    }

    #[test]
    fn test_select_text_wildcard() {
        let map = ContentTypeMap::default();
        assert_eq!(map.select(Some("TEXT/HTML; charset=utf-8")).unwrap(), Format::Text);
    }

    #[test]
    fn test_unmatched_is_unsupported() {
        let map = ContentTypeMap::empty().with("application/hal+json", Format::Hal, 1.0);
        match map.select(Some("application/xml")) {
            Err(HypermediaError::UnsupportedMediaType(ct)) => assert_eq!(ct, "application/xml"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_register_replaces_entry() {
        let mut map = ContentTypeMap::default();
        let before = map.entries().len();
        map.register("application/json", Format::JsonApi, 0.95);
        assert_eq!(map.entries().len(), before);
        assert_eq!(map.select(Some("application/json")).unwrap(), Format::JsonApi);

        map.register("text/event-stream", Format::Stream, 0.5);
        assert_eq!(map.select(Some("text/event-stream")).unwrap(), Format::Stream);
    }

    #[test]
    fn test_accept_header_order() {
        let map = ContentTypeMap::empty()
            .with("*/*", Format::Binary, 0.1)
            .with("application/hal+json", Format::Hal, 0.9)
            .with("application/vnd.api+json", Format::JsonApi, 0.8);
        assert_eq!(
            map.accept_header(),
            "application/hal+json;q=0.9, application/vnd.api+json;q=0.8, */*;q=0.1"
        );
    }

    #[test]
    fn test_parse_empty_json_body() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/hal+json"));
        headers.insert(http::header::LINK, HeaderValue::from_static("</next>; rel=\"next\""));

        let state = Format::Hal
            .parse("https://example.org/list", &headers, Bytes::new())
            .unwrap();
        assert_eq!(state.body(), &Body::Empty);
        assert_eq!(state.get_link("next").unwrap().href, "/next");
        assert_eq!(state.content_type(), Some("application/hal+json"));
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        let err = Format::Siren
            .parse("https://example.org/", &HeaderMap::new(), Bytes::from_static(b"{"))
            .unwrap_err();
        assert!(matches!(err, HypermediaError::MalformedRepresentation { ref field, .. } if field == "body"));
    }
}
