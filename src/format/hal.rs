//! HAL and HAL-FORMS.
//!
//! | Member | Becomes |
//! |--------|---------|
//! | `_links` | [`Links`], one link per object (entries may be arrays) |
//! | `_embedded` | embedded states, `One` for objects and `Many` for arrays |
//! | `_templates` | [`Form`]s keyed by template name |
//! | everything else | the JSON body |
//!
//! A document carrying a top-level `page` object is a paged collection: its
//! collection is every embedded state.

use crate::error::{HypermediaError, Result};
use crate::protocol::resolve_uri;
use crate::types::{Body, Embedded, Field, FieldType, Form, Link, Links, State};
use http::Method;
use serde_json::{Map, Value};

/// Parse a HAL document found at `uri`.
pub fn parse(uri: &str, document: Value) -> Result<State> {
    let Value::Object(mut body) = document else {
        return Err(HypermediaError::malformed("body", "HAL document must be a JSON object"));
    };

    let links_member = body.remove("_links");
    let embedded_member = body.remove("_embedded");
    let templates_member = body.remove("_templates");
    // page metadata is envelope, a scalar `page` is data
    let paged = match body.remove("page") {
        Some(page) if page.is_object() => true,
        Some(other) => {
            body.insert("page".to_string(), other);
            false
        }
        None => false,
    };

    let mut links = Links::new(uri);
    if let Some(member) = &links_member {
        parse_links(uri, member, &mut links)?;
    }
    let self_href = links.get("self").map(|l| l.href.clone());

    let mut state = State::new(uri, Body::Json(Value::Object(body))).with_links(links);

    if let Some(member) = embedded_member {
        parse_embedded(uri, member, &mut state)?;
    }

    if let Some(member) = &templates_member {
        let default_target = self_href.as_deref().unwrap_or(uri);
        for form in parse_templates(uri, default_target, member)? {
            state.add_form(form);
        }
    }

    if paged {
        let members = state
            .embedded()
            .values()
            .flat_map(|e| e.as_slice().iter().cloned())
            .collect();
        state.set_collection(members);
    }

    Ok(state)
}

fn parse_links(context: &str, member: &Value, links: &mut Links) -> Result<()> {
    let Value::Object(rels) = member else {
        return Err(HypermediaError::malformed("_links", "expected an object"));
    };

    for (rel, value) in rels {
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    links.add(parse_link(context, rel, item, &format!("_links.{}[{}]", rel, i))?);
                }
            }
            item => links.add(parse_link(context, rel, item, &format!("_links.{}", rel))?),
        }
    }
    Ok(())
}

fn parse_link(context: &str, rel: &str, value: &Value, field: &str) -> Result<Link> {
    let Value::Object(obj) = value else {
        return Err(HypermediaError::malformed(field, "expected a link object"));
    };
    let href = str_member(obj, "href")
        .ok_or_else(|| HypermediaError::malformed(format!("{}.href", field), "missing href"))?;

    let mut link = Link::new(context, rel, href);
    link.templated = obj.get("templated").and_then(Value::as_bool).unwrap_or(false);
    link.title = str_member(obj, "title").map(str::to_string);
    link.content_type = str_member(obj, "type").map(str::to_string);
    link.name = str_member(obj, "name").map(str::to_string);
    link.hreflang = str_member(obj, "hreflang").map(str::to_string);
    if let Some(deprecation) = obj.get("deprecation") {
        link.hints = Some(serde_json::json!({ "deprecation": deprecation }));
    }
    Ok(link)
}

fn parse_embedded(context: &str, member: Value, state: &mut State) -> Result<()> {
    let Value::Object(rels) = member else {
        return Err(HypermediaError::malformed("_embedded", "expected an object"));
    };

    for (rel, value) in rels {
        match value {
            Value::Array(items) => {
                let mut states = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(child) = parse_embedded_item(context, &rel, item, state)? {
                        states.push(child);
                    }
                }
                state.add_embedded(rel, Embedded::Many(states));
            }
            Value::Object(_) => {
                if let Some(child) = parse_embedded_item(context, &rel, value, state)? {
                    state.add_embedded(rel, Embedded::One(child));
                }
            }
            _ => {
                return Err(HypermediaError::malformed(
                    format!("_embedded.{}", rel),
                    "expected an object or array",
                ))
            }
        }
    }
    Ok(())
}

/// Parse one embedded resource. Resources without a `self` link have no
/// identity and are skipped.
fn parse_embedded_item(context: &str, rel: &str, item: Value, parent: &mut State) -> Result<Option<State>> {
    let Some(self_href) = self_href(&item) else {
        tracing::debug!("Skipping embedded `{}` without a self link in {}", rel, context);
        return Ok(None);
    };
    let child_uri = resolve_uri(context, &self_href)?;
    parent.links_mut().add(Link::new(context, rel, self_href));
    parse(&child_uri, item).map(Some)
}

fn self_href(item: &Value) -> Option<String> {
    let entry = item.get("_links")?.get("self")?;
    let entry = match entry {
        Value::Array(items) => items.first()?,
        other => other,
    };
    entry.get("href")?.as_str().map(str::to_string)
}

fn parse_templates(context: &str, default_target: &str, member: &Value) -> Result<Vec<Form>> {
    let Value::Object(templates) = member else {
        return Err(HypermediaError::malformed("_templates", "expected an object"));
    };

    let mut forms = Vec::with_capacity(templates.len());
    for (name, template) in templates {
        let field = format!("_templates.{}", name);
        let Value::Object(obj) = template else {
            return Err(HypermediaError::malformed(field, "expected an object"));
        };

        let target = str_member(obj, "target").unwrap_or(default_target);
        let uri = resolve_uri(context, target)?;
        let method = match str_member(obj, "method") {
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| HypermediaError::malformed(format!("{}.method", field), m))?,
            None => Method::GET,
        };

        let mut form = Form::new(name.clone(), uri, method);
        if let Some(ct) = str_member(obj, "contentType") {
            form = form.with_content_type(ct);
        }
        form.title = str_member(obj, "title").map(str::to_string);

        if let Some(properties) = obj.get("properties") {
            let Value::Array(properties) = properties else {
                return Err(HypermediaError::malformed(format!("{}.properties", field), "expected an array"));
            };
            for (i, property) in properties.iter().enumerate() {
                form.fields.push(parse_property(property, &format!("{}.properties[{}]", field, i))?);
            }
        }
        forms.push(form);
    }
    Ok(forms)
}

fn parse_property(value: &Value, field: &str) -> Result<Field> {
    let Value::Object(obj) = value else {
        return Err(HypermediaError::malformed(field, "expected an object"));
    };
    let name = str_member(obj, "name")
        .ok_or_else(|| HypermediaError::malformed(format!("{}.name", field), "missing name"))?;

    let mut out = Field::new(name, FieldType::parse(str_member(obj, "type").unwrap_or("text")));
    out.required = obj.get("required").and_then(Value::as_bool).unwrap_or(false);
    out.read_only = obj.get("readOnly").and_then(Value::as_bool).unwrap_or(false);
    out.label = str_member(obj, "prompt").map(str::to_string);
    out.pattern = str_member(obj, "regex").map(str::to_string);
    out.value = obj.get("value").filter(|v| !v.is_null()).cloned();

    if let Some(inline) = obj
        .get("options")
        .and_then(|o| o.get("inline"))
        .and_then(Value::as_array)
    {
        out.options = inline
            .iter()
            .map(|option| option.get("value").cloned().unwrap_or_else(|| option.clone()))
            .collect();
        if out.field_type == FieldType::Text {
            out.field_type = FieldType::Select;
        }
    }
    Ok(out)
}

fn str_member<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URI: &str = "https://example.org/api/users/1";

    #[test]
    fn test_links_and_data() {
        let state = parse(
            "https://example.org/",
            json!({
                "_links": {
                    "self": {"href": "/"},
                    "me": {"href": "/api/users/1", "title": "Me"},
                    "item": [{"href": "/a"}, {"href": "/b"}],
                    "search": {"href": "/search{?q}", "templated": true}
                },
                "name": "root"
            }),
        )
        .unwrap();

        assert_eq!(state.data(), Some(&json!({"name": "root"})));
        assert_eq!(state.get_link("me").unwrap().resolve().unwrap(), "https://example.org/api/users/1");
        assert_eq!(state.get_link("me").unwrap().title.as_deref(), Some("Me"));
        assert_eq!(state.links().get_many("item").len(), 2);
        assert!(state.get_link("search").unwrap().templated);
    }

    #[test]
    fn test_link_without_href_is_malformed() {
        let err = parse(URI, json!({"_links": {"me": {"title": "x"}}})).unwrap_err();
        match err {
            HypermediaError::MalformedRepresentation { field, .. } => assert_eq!(field, "_links.me.href"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_embedded_one_and_many() {
        let state = parse(
            URI,
            json!({
                "_links": {"self": {"href": "/api/users/1"}},
                "_embedded": {
                    "accounts": [
                        {"_links": {"self": {"href": "/api/accounts/1"}}, "n": 1},
                        {"_links": {"self": {"href": "/api/accounts/2"}}, "n": 2}
                    ],
                    "manager": {"_links": {"self": {"href": "/api/users/9"}}, "name": "Grace"},
                    "anonymous": {"name": "no self link"}
                }
            }),
        )
        .unwrap();

        let accounts = state.get_embedded("accounts").unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts.as_slice()[1].uri(), "https://example.org/api/accounts/2");
        assert_eq!(accounts.as_slice()[1].data(), Some(&json!({"n": 2})));
        assert_eq!(state.links().get_many("accounts").len(), 2);

        let manager = state.get_embedded("manager").unwrap();
        assert!(manager.is_one());
        assert_eq!(manager.first().unwrap().get_link("self").unwrap().href, "/api/users/9");

        assert!(state.get_embedded("anonymous").is_none());
        assert!(state.collection().is_empty());
    }

    #[test]
    fn test_paged_collection() {
        let state = parse(
            "https://example.org/orders",
            json!({
                "page": {"size": 2, "number": 0},
                "_embedded": {"orders": [
                    {"_links": {"self": {"href": "/orders/1"}}},
                    {"_links": {"self": {"href": "/orders/2"}}}
                ]}
            }),
        )
        .unwrap();
        let uris: Vec<_> = state.collection().iter().map(State::uri).collect();
        assert_eq!(uris, vec!["https://example.org/orders/1", "https://example.org/orders/2"]);
    }

    #[test]
    fn test_page_metadata_not_in_data() {
        let state = parse(
            "https://example.org/orders",
            json!({
                "page": {"size": 1, "number": 0},
                "total": 1,
                "_embedded": {"orders": [{"_links": {"self": {"href": "/orders/1"}}}]}
            }),
        )
        .unwrap();
        assert_eq!(state.data(), Some(&json!({"total": 1})));
        assert_eq!(state.collection().len(), 1);
    }

    #[test]
    fn test_scalar_page_is_data() {
        let state = parse("https://example.org/book", json!({"page": 12})).unwrap();
        assert_eq!(state.data(), Some(&json!({"page": 12})));
        assert!(state.collection().is_empty());
    }

    #[test]
    fn test_templates() {
        let state = parse(
            URI,
            json!({
                "_links": {"self": {"href": "/api/users/1"}},
                "_templates": {
                    "default": {
                        "method": "put",
                        "properties": [
                            {"name": "name", "required": true, "prompt": "Name"},
                            {"name": "age", "type": "number", "value": 30},
                            {"name": "role", "options": {"inline": ["admin", {"prompt": "User", "value": "user"}]}}
                        ]
                    },
                    "search": {"target": "/api/users", "title": "Search"}
                }
            }),
        )
        .unwrap();

        let edit = state.get_form("default", "PUT").unwrap();
        assert_eq!(edit.uri, URI);
        assert_eq!(edit.content_type, "application/json");
        assert!(edit.field("name").unwrap().required);
        assert_eq!(edit.field("age").unwrap().field_type, FieldType::Number);
        assert_eq!(edit.field("role").unwrap().options, vec![json!("admin"), json!("user")]);
        assert_eq!(edit.field("role").unwrap().field_type, FieldType::Select);

        let search = state.get_form("search", "GET").unwrap();
        assert_eq!(search.uri, "https://example.org/api/users");
        assert_eq!(search.title.as_deref(), Some("Search"));
    }

    #[test]
    fn test_non_object_document() {
        assert!(matches!(
            parse(URI, json!([1, 2])),
            Err(HypermediaError::MalformedRepresentation { .. })
        ));
    }
}
