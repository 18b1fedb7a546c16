//! RFC 6570 URI template expansion (level 4).
//!
//! Supports every operator (`+ # . / ; ? &`), the explode modifier (`*`) and
//! prefix modifiers (`:n`). Values come from a [`Variables`] map of JSON
//! values: strings, numbers and booleans are scalars, arrays are lists and
//! objects are associative arrays. `null`, empty lists and empty objects
//! count as undefined and are skipped.
//!
//! # Examples
//!
//! ```
//! use hypermedia_client::protocol::{expand_template, Variables};
//! use serde_json::json;
//!
//! let mut vars = Variables::new();
//! vars.insert("id".into(), json!(42));
//! vars.insert("fields".into(), json!(["name", "email"]));
//!
//! let uri = expand_template("/users/{id}{?fields*}", &vars).unwrap();
//! assert_eq!(uri, "/users/42?fields=name&fields=email");
//! ```

use crate::error::{HypermediaError, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Template variables, keyed by variable name.
pub type Variables = BTreeMap<String, Value>;

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("static regex is valid"))
}

/// Whether `href` contains at least one template expression.
pub fn is_template(href: &str) -> bool {
    expression_regex().is_match(href)
}

/// Expand every `{...}` expression in `template`.
pub fn expand_template(template: &str, vars: &Variables) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in expression_regex().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&expand_expression(&caps[1], vars)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);

    Ok(out)
}

struct Operator {
    first: &'static str,
    sep: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    fn from_char(op: Option<char>) -> Self {
        let (first, sep, named, if_empty, allow_reserved) = match op {
            None => ("", ",", false, "", false),
            Some('+') => ("", ",", false, "", true),
            Some('#') => ("#", ",", false, "", true),
            Some('.') => (".", ".", false, "", false),
            Some('/') => ("/", "/", false, "", false),
            Some(';') => (";", ";", true, "", false),
            Some('?') => ("?", "&", true, "=", false),
            Some('&') => ("&", "&", true, "=", false),
            Some(_) => ("", ",", false, "", false),
        };
        Operator {
            first,
            sep,
            named,
            if_empty,
            allow_reserved,
        }
    }

    fn encode(&self, value: &str) -> String {
        pct_encode(value, self.allow_reserved)
    }

    fn named_pair(&self, name: &str, encoded: &str) -> String {
        if encoded.is_empty() {
            format!("{}{}", name, self.if_empty)
        } else {
            format!("{}={}", name, encoded)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

fn parse_varspec(spec: &str) -> Result<(&str, Modifier)> {
    let spec = spec.trim();
    if let Some(name) = spec.strip_suffix('*') {
        return Ok((name, Modifier::Explode));
    }
    if let Some((name, len)) = spec.split_once(':') {
        let len: usize = len.parse().map_err(|_| {
            HypermediaError::InvalidUri(format!("invalid prefix modifier in template: {}", spec))
        })?;
        return Ok((name, Modifier::Prefix(len)));
    }
    Ok((spec, Modifier::None))
}

fn expand_expression(expr: &str, vars: &Variables) -> Result<String> {
    let op_char = expr.chars().next().filter(|c| "+#./;?&".contains(*c));
    let body = match op_char {
        Some(c) => &expr[c.len_utf8()..],
        None => expr,
    };
    let op = Operator::from_char(op_char);

    let mut parts = Vec::new();
    for varspec in body.split(',') {
        let (name, modifier) = parse_varspec(varspec)?;
        if name.is_empty() {
            continue;
        }
        let Some(value) = vars.get(name).filter(|v| is_defined(v)) else {
            continue;
        };

        match value {
            Value::Array(items) => {
                let encoded: Vec<String> = items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| op.encode(&scalar_string(v)))
                    .collect();
                if modifier == Modifier::Explode {
                    let exploded: Vec<String> = encoded
                        .iter()
                        .map(|e| if op.named { op.named_pair(name, e) } else { e.clone() })
                        .collect();
                    parts.push(exploded.join(op.sep));
                } else {
                    let joined = encoded.join(",");
                    parts.push(if op.named { op.named_pair(name, &joined) } else { joined });
                }
            }
            Value::Object(map) => {
                let pairs = map.iter().filter(|(_, v)| !v.is_null());
                if modifier == Modifier::Explode {
                    let exploded: Vec<String> = pairs
                        .map(|(k, v)| {
                            let key = op.encode(k);
                            let val = op.encode(&scalar_string(v));
                            if op.named {
                                op.named_pair(&key, &val)
                            } else {
                                format!("{}={}", key, val)
                            }
                        })
                        .collect();
                    parts.push(exploded.join(op.sep));
                } else {
                    let joined = pairs
                        .flat_map(|(k, v)| [op.encode(k), op.encode(&scalar_string(v))])
                        .collect::<Vec<_>>()
                        .join(",");
                    parts.push(if op.named { op.named_pair(name, &joined) } else { joined });
                }
            }
            scalar => {
                let mut s = scalar_string(scalar);
                if let Modifier::Prefix(len) = modifier {
                    s = s.chars().take(len).collect();
                }
                let encoded = op.encode(&s);
                parts.push(if op.named { op.named_pair(name, &encoded) } else { encoded });
            }
        }
    }

    if parts.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{}{}", op.first, parts.join(op.sep)))
    }
}

fn is_defined(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|v| !v.is_null()),
        Value::Object(map) => map.values().any(|v| !v.is_null()),
        _ => true,
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

const RESERVED: &[u8] = b":/?#[]@!$&'()*+,;=";

fn pct_encode(value: &str, allow_reserved: bool) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let unreserved = b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~');
        if unreserved || (allow_reserved && RESERVED.contains(&b)) {
            out.push(b as char);
        } else if allow_reserved
            && b == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            // already pct-encoded triplets pass through in reserved expansion
            out.push('%');
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
        i += 1;
    }

    out
}
