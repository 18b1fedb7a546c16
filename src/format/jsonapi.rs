//! JSON:API documents.
//!
//! Top-level `links` become links; values may be plain strings or link
//! objects with an `href`. When `data` is an array the document is a
//! collection: every resource object's `links.self` is exposed as an `item`
//! link and becomes a collection member. The body is the document without
//! its top-level `links`.

use crate::error::{HypermediaError, Result};
use crate::protocol::resolve_uri;
use crate::types::{Body, Link, Links, State};
use serde_json::Value;

/// Relation under which collection members are exposed.
pub const ITEM_REL: &str = "item";

/// Parse a JSON:API document found at `uri`.
pub fn parse(uri: &str, document: Value) -> Result<State> {
    let Value::Object(mut body) = document else {
        return Err(HypermediaError::malformed("body", "JSON:API document must be a JSON object"));
    };

    let mut links = Links::new(uri);
    if let Some(member) = body.remove("links") {
        parse_links(uri, &member, &mut links)?;
    }

    let mut collection = Vec::new();
    if let Some(Value::Array(items)) = body.get("data") {
        for item in items {
            let Some(href) = item.get("links").and_then(|l| l.get("self")).and_then(link_href) else {
                continue;
            };
            links.add(Link::new(uri, ITEM_REL, href));

            let member_uri = resolve_uri(uri, href)?;
            let mut member = State::new(member_uri.clone(), Body::Json(item.clone()));
            member.links_mut().add(Link::new(member_uri, "self", href));
            collection.push(member);
        }
    }

    let mut state = State::new(uri, Body::Json(Value::Object(body))).with_links(links);
    state.set_collection(collection);
    Ok(state)
}

fn parse_links(context: &str, member: &Value, links: &mut Links) -> Result<()> {
    let Value::Object(rels) = member else {
        return Err(HypermediaError::malformed("links", "expected an object"));
    };

    for (rel, value) in rels {
        match value {
            // JSON:API allows null for links that do not currently exist
            Value::Null => {}
            _ => {
                let href = link_href(value).ok_or_else(|| {
                    HypermediaError::malformed(format!("links.{}", rel), "expected a string or an object with href")
                })?;
                let mut link = Link::new(context, rel.clone(), href);
                if let Some(meta) = value.get("meta") {
                    link.hints = Some(meta.clone());
                }
                link.title = value.get("title").and_then(Value::as_str).map(str::to_string);
                link.content_type = value.get("type").and_then(Value::as_str).map(str::to_string);
                links.add(link);
            }
        }
    }
    Ok(())
}

fn link_href(value: &Value) -> Option<&str> {
    match value {
        Value::String(href) => Some(href),
        Value::Object(obj) => obj.get("href").and_then(Value::as_str),
        _ => None,
    }
}
