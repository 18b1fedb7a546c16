//! Links and the per-representation link store.
//!
//! A [`Link`] keeps its `href` exactly as the server sent it together with
//! the `context` URI it appeared in. Resolution to an absolute URI happens
//! on demand via [`Link::resolve`] / [`Link::expand`].

use crate::error::{HypermediaError, Result};
use crate::protocol::{append_query, expand_template, resolve_uri, Variables};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed link from a context resource to a target resource.
///
/// # Examples
///
/// ```
/// use hypermedia_client::Link;
///
/// let link = Link::new("https://example.org/", "me", "/api/users/1");
/// assert_eq!(link.resolve().unwrap(), "https://example.org/api/users/1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Target, possibly relative or an RFC 6570 template.
    pub href: String,
    /// URI of the document this link was found in.
    pub context: String,
    /// Relation type.
    pub rel: String,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Media type hint for the target.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// `href` is an RFC 6570 URI template.
    #[serde(default)]
    pub templated: bool,
    /// Free-form target hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Value>,
    /// Secondary key for selecting among links with the same rel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overrides the link context (RFC 8288 `anchor`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// Language of the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
    /// Media query for the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl Link {
    /// Create a link with only the required members set.
    pub fn new(
        context: impl Into<String>,
        rel: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        Link {
            href: href.into(),
            context: context.into(),
            rel: rel.into(),
            title: None,
            content_type: None,
            templated: false,
            hints: None,
            name: None,
            anchor: None,
            hreflang: None,
            media: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the target media type hint.
    pub fn with_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Mark the href as a URI template.
    pub fn templated(mut self) -> Self {
        self.templated = true;
        self
    }

    /// Resolve the target to an absolute URI.
    ///
    /// Templated links are expanded with no variables, which drops every
    /// expression.
    pub fn resolve(&self) -> Result<String> {
        self.expand(&Variables::new())
    }

    /// Resolve the target to an absolute URI, applying `variables`.
    ///
    /// Templated links are expanded per RFC 6570. Plain links get the
    /// variables appended as query parameters.
    pub fn expand(&self, variables: &Variables) -> Result<String> {
        if self.templated {
            let href = expand_template(&self.href, variables)?;
            return resolve_uri(&self.context, &href);
        }

        let uri = resolve_uri(&self.context, &self.href)?;
        if variables.is_empty() {
            Ok(uri)
        } else {
            append_query(&uri, variables)
        }
    }
}

/// Multi-map of links keyed by relation, preserving insertion order.
///
/// # Examples
///
/// ```
/// use hypermedia_client::{Link, Links};
///
/// let mut links = Links::new("https://example.org/");
/// links.add(Link::new("https://example.org/", "item", "/a"));
/// links.add(Link::new("https://example.org/", "item", "/b"));
///
/// assert_eq!(links.get("item").unwrap().href, "/a");
/// assert_eq!(links.get_many("item").len(), 2);
///
/// links.set(Link::new("https://example.org/", "item", "/c"));
/// assert_eq!(links.get_many("item").len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Links {
    default_context: String,
    store: Vec<Link>,
}

impl Links {
    /// Create an empty store. `default_context` is used by [`Links::add_href`].
    pub fn new(default_context: impl Into<String>) -> Self {
        Links {
            default_context: default_context.into(),
            store: Vec::new(),
        }
    }

    /// Create a store pre-filled with `links`.
    pub fn with_links(default_context: impl Into<String>, links: impl IntoIterator<Item = Link>) -> Self {
        let mut store = Links::new(default_context);
        store.add_many(links);
        store
    }

    /// Context URI used for links added via [`Links::add_href`].
    pub fn default_context(&self) -> &str {
        &self.default_context
    }

    /// Append a link. Existing links with the same rel are kept.
    pub fn add(&mut self, link: Link) {
        self.store.push(link);
    }

    /// Append every link in order.
    pub fn add_many(&mut self, links: impl IntoIterator<Item = Link>) {
        self.store.extend(links);
    }

    /// Append a link built from the default context.
    pub fn add_href(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        let link = Link::new(self.default_context.clone(), rel, href);
        self.add(link);
    }

    /// Replace every link under `link.rel` with `link`.
    pub fn set(&mut self, link: Link) {
        self.delete(&link.rel);
        self.store.push(link);
    }

    /// First link with this rel.
    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.store.iter().find(|l| l.rel == rel)
    }

    /// First link with this rel, or [`HypermediaError::RelationNotFound`].
    pub fn require(&self, rel: &str) -> Result<&Link> {
        self.get(rel)
            .ok_or_else(|| HypermediaError::relation_not_found(rel, self.default_context.clone()))
    }

    /// All links with this rel, in insertion order.
    pub fn get_many(&self, rel: &str) -> Vec<&Link> {
        self.store.iter().filter(|l| l.rel == rel).collect()
    }

    /// Whether any link with this rel exists.
    pub fn has(&self, rel: &str) -> bool {
        self.store.iter().any(|l| l.rel == rel)
    }

    /// Remove every link with this rel.
    pub fn delete(&mut self, rel: &str) {
        self.store.retain(|l| l.rel != rel);
    }

    /// Every link, in insertion order.
    pub fn get_all(&self) -> &[Link] {
        &self.store
    }

    /// Distinct relation names, in order of first appearance.
    pub fn rels(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for link in &self.store {
            if !seen.contains(&link.rel.as_str()) {
                seen.push(&link.rel);
            }
        }
        seen
    }

    /// Iterate over every link.
    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.store.iter()
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<'a> IntoIterator for &'a Links {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.store.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CTX: &str = "https://example.org/";

    #[test]
    fn test_add_keeps_duplicates_in_order() {
        let mut links = Links::new(CTX);
        links.add(Link::new(CTX, "item", "/1"));
        links.add(Link::new(CTX, "other", "/x"));
        links.add(Link::new(CTX, "item", "/2"));
        links.add(Link::new(CTX, "item", "/1"));

        let hrefs: Vec<_> = links.get_many("item").iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/1", "/2", "/1"]);
        assert_eq!(links.get("item").unwrap().href, "/1");
    }

    #[test]
    fn test_set_replaces() {
        let mut links = Links::new(CTX);
        links.add_many([Link::new(CTX, "item", "/1"), Link::new(CTX, "item", "/2")]);
        links.set(Link::new(CTX, "item", "/3"));
        let hrefs: Vec<_> = links.get_many("item").iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/3"]);
    }

    #[test]
    fn test_has_and_delete() {
        let mut links = Links::new(CTX);
        links.add_href("self", "/");
        assert!(links.has("self"));
        assert!(!links.has("next"));
        links.delete("self");
        assert!(!links.has("self"));
        assert!(links.is_empty());
    }

    #[test]
    fn test_require_names_rel() {
        let links = Links::new(CTX);
        match links.require("nonexistent") {
            Err(HypermediaError::RelationNotFound { rel, .. }) => assert_eq!(rel, "nonexistent"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rels_first_appearance_order() {
        let links = Links::with_links(
            CTX,
            [
                Link::new(CTX, "b", "/1"),
                Link::new(CTX, "a", "/2"),
                Link::new(CTX, "b", "/3"),
            ],
        );
        assert_eq!(links.rels(), vec!["b", "a"]);
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn test_resolve_root_relative() {
        let link = Link::new("https://example.org/", "me", "/api/users/1");
        assert_eq!(link.resolve().unwrap(), "https://example.org/api/users/1");
    }

    #[test]
    fn test_resolve_protocol_relative_context() {
        let link = Link::new("//cdn.example/img/", "icon", "logo.png");
        assert_eq!(link.resolve().unwrap(), "//cdn.example/img/logo.png");
    }

    #[test]
    fn test_expand_templated() {
        let link = Link::new(CTX, "user", "/users/{id}{?expand}").templated();
        let mut vars = Variables::new();
        vars.insert("id".into(), json!(7));
        vars.insert("expand".into(), json!("orders"));
        assert_eq!(link.expand(&vars).unwrap(), "https://example.org/users/7?expand=orders");
    }

    #[test]
    fn test_expand_plain_appends_query() {
        let link = Link::new(CTX, "search", "/search");
        let mut vars = Variables::new();
        vars.insert("q".into(), json!("rust"));
        assert_eq!(link.expand(&vars).unwrap(), "https://example.org/search?q=rust");
    }

    #[test]
    fn test_serde_uses_type_member() {
        let link = Link::new(CTX, "alternate", "/feed").with_type("application/atom+xml");
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value["type"], "application/atom+xml");
        assert!(value.get("title").is_none());
    }
}
