//! Siren entities.
//!
//! - `properties` is the body.
//! - `links[]` fan out to one [`Link`] per entry of their `rel` array.
//! - `entities[]` carrying an `href` are embedded links; entities carrying
//!   content are embedded states (always `Many`). Either way the target is
//!   exposed as a link under each of the entity's rels.
//! - `actions[]` become [`Form`]s registered under the action name.
//!
//! The collection is every embedded entity with the `item` rel.

use crate::error::{HypermediaError, Result};
use crate::protocol::resolve_uri;
use crate::types::form::FORM_URLENCODED;
use crate::types::{Body, Embedded, Field, FieldType, Form, Link, Links, State};
use http::Method;
use serde_json::{Map, Value};

/// Relation marking collection members.
pub const ITEM_REL: &str = "item";

/// Parse a Siren entity found at `uri`.
pub fn parse(uri: &str, document: Value) -> Result<State> {
    let Value::Object(mut entity) = document else {
        return Err(HypermediaError::malformed("body", "Siren entity must be a JSON object"));
    };

    let properties = match entity.remove("properties") {
        Some(Value::Object(props)) => Value::Object(props),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(_) => return Err(HypermediaError::malformed("properties", "expected an object")),
    };

    let mut links = Links::new(uri);
    if let Some(member) = entity.get("links") {
        for (i, entry) in array(member, "links")?.iter().enumerate() {
            links.add_many(parse_link(uri, entry, &format!("links[{}]", i))?);
        }
    }

    let mut state = State::new(uri, Body::Json(properties)).with_links(links);

    if let Some(member) = entity.remove("entities") {
        for (i, sub) in array(&member, "entities")?.iter().enumerate() {
            parse_sub_entity(uri, sub, &format!("entities[{}]", i), &mut state)?;
        }
    }

    if let Some(member) = entity.get("actions") {
        for (i, action) in array(member, "actions")?.iter().enumerate() {
            state.add_form(parse_action(uri, action, &format!("actions[{}]", i))?);
        }
    }

    let members = state
        .get_embedded(ITEM_REL)
        .map(|e| e.as_slice().to_vec())
        .unwrap_or_default();
    state.set_collection(members);

    Ok(state)
}

fn array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| HypermediaError::malformed(field, "expected an array"))
}

fn rels(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>> {
    match obj.get("rel") {
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Some(Value::String(rel)) => Ok(vec![rel.clone()]),
        _ => Err(HypermediaError::malformed(format!("{}.rel", field), "missing rel")),
    }
}

fn parse_link(context: &str, entry: &Value, field: &str) -> Result<Vec<Link>> {
    let Value::Object(obj) = entry else {
        return Err(HypermediaError::malformed(field, "expected an object"));
    };
    let href = str_member(obj, "href")
        .ok_or_else(|| HypermediaError::malformed(format!("{}.href", field), "missing href"))?;
    let title = str_member(obj, "title");
    let content_type = str_member(obj, "type");

    Ok(rels(obj, field)?
        .into_iter()
        .map(|rel| {
            let mut link = Link::new(context, rel, href);
            link.title = title.map(str::to_string);
            link.content_type = content_type.map(str::to_string);
            link
        })
        .collect())
}

fn parse_sub_entity(context: &str, sub: &Value, field: &str, parent: &mut State) -> Result<()> {
    let Value::Object(obj) = sub else {
        return Err(HypermediaError::malformed(field, "expected an object"));
    };
    let rels = rels(obj, field)?;

    // embedded link
    if obj.contains_key("href") {
        parent.links_mut().add_many(parse_link(context, sub, field)?);
        return Ok(());
    }

    // embedded representation
    let self_href = obj
        .get("links")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .find(|l| self::rels(l, field).is_ok_and(|r| r.iter().any(|rel| rel == "self")))
        .and_then(|l| str_member(l, "href"));
    let Some(self_href) = self_href else {
        tracing::debug!("Skipping {} without a self link in {}", field, context);
        return Ok(());
    };

    let child_uri = resolve_uri(context, self_href)?;
    let child = parse(&child_uri, sub.clone())?;
    for rel in rels {
        parent.links_mut().add(Link::new(context, rel.clone(), self_href));
        parent.add_embedded(rel, Embedded::Many(vec![child.clone()]));
    }
    Ok(())
}

fn parse_action(context: &str, action: &Value, field: &str) -> Result<Form> {
    let Value::Object(obj) = action else {
        return Err(HypermediaError::malformed(field, "expected an object"));
    };
    let name = str_member(obj, "name")
        .ok_or_else(|| HypermediaError::malformed(format!("{}.name", field), "missing name"))?;
    let href = str_member(obj, "href")
        .ok_or_else(|| HypermediaError::malformed(format!("{}.href", field), "missing href"))?;
    let method = match str_member(obj, "method") {
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| HypermediaError::malformed(format!("{}.method", field), m))?,
        None => Method::GET,
    };

    let mut form = Form::new(name, resolve_uri(context, href)?, method)
        .with_content_type(str_member(obj, "type").unwrap_or(FORM_URLENCODED));
    form.title = str_member(obj, "title").map(str::to_string);

    if let Some(fields) = obj.get("fields") {
        let fields_field = format!("{}.fields", field);
        for (i, f) in array(fields, &fields_field)?.iter().enumerate() {
            form.fields.push(parse_field(f, &format!("{}[{}]", fields_field, i))?);
        }
    }
    Ok(form)
}

fn parse_field(value: &Value, field: &str) -> Result<Field> {
    let Value::Object(obj) = value else {
        return Err(HypermediaError::malformed(field, "expected an object"));
    };
    let name = str_member(obj, "name")
        .ok_or_else(|| HypermediaError::malformed(format!("{}.name", field), "missing name"))?;

    let mut out = Field::new(name, FieldType::parse(str_member(obj, "type").unwrap_or("text")));
    out.label = str_member(obj, "title").map(str::to_string);
    out.required = obj.get("required").and_then(Value::as_bool).unwrap_or(false);
    out.read_only = obj.get("readOnly").and_then(Value::as_bool).unwrap_or(false);
    out.pattern = str_member(obj, "pattern").map(str::to_string);

    match obj.get("value") {
        // radio/select fields list their options as [{value, title, selected}]
        Some(Value::Array(options)) if matches!(out.field_type, FieldType::Radio | FieldType::Select) => {
            out.options = options
                .iter()
                .map(|o| o.get("value").cloned().unwrap_or_else(|| o.clone()))
                .collect();
            out.value = options
                .iter()
                .find(|o| o.get("selected").and_then(Value::as_bool) == Some(true))
                .and_then(|o| o.get("value").cloned());
        }
        Some(Value::Null) | None => {}
        Some(v) => out.value = Some(v.clone()),
    }
    Ok(out)
}

fn str_member<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}
