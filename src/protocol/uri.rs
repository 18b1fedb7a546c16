//! Relative reference resolution (RFC 3986 section 5).
//!
//! Resolution is delegated to [`url::Url::join`]. Protocol-relative bases
//! (`//host/path`) have no scheme for `url` to work with, so they are
//! resolved under a placeholder scheme that is stripped again afterwards.

use crate::error::{HypermediaError, Result};
use serde_json::Value;
use url::Url;

const PLACEHOLDER_SCHEME: &str = "http:";

/// Resolve `relative` against `base`.
///
/// # Examples
///
/// ```
/// use hypermedia_client::protocol::resolve_uri;
///
/// assert_eq!(
///     resolve_uri("https://example.org/", "/api/users/1").unwrap(),
///     "https://example.org/api/users/1"
/// );
/// assert_eq!(
///     resolve_uri("//cdn.example/assets/", "img.png").unwrap(),
///     "//cdn.example/assets/img.png"
/// );
/// ```
pub fn resolve_uri(base: &str, relative: &str) -> Result<String> {
    if let Ok(absolute) = Url::parse(relative) {
        return Ok(absolute.to_string());
    }

    if base.starts_with("//") {
        let placeholder = format!("{}{}", PLACEHOLDER_SCHEME, base);
        let resolved = Url::parse(&placeholder)
            .and_then(|b| b.join(relative))
            .map_err(|e| HypermediaError::InvalidUri(format!("{} ({})", base, e)))?;
        let resolved = resolved.to_string();
        return Ok(resolved
            .strip_prefix(PLACEHOLDER_SCHEME)
            .map(str::to_string)
            .unwrap_or(resolved));
    }

    let base_url = Url::parse(base)
        .map_err(|e| HypermediaError::InvalidUri(format!("{} ({})", base, e)))?;
    base_url
        .join(relative)
        .map(|u| u.to_string())
        .map_err(|e| HypermediaError::InvalidUri(format!("{} ({})", relative, e)))
}

/// Append query parameters to an absolute or protocol-relative URI.
///
/// `null` values are skipped, arrays add one pair per item and objects are
/// sent as their JSON text.
pub fn append_query<'a, I>(uri: &str, params: I) -> Result<String>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let protocol_relative = uri.starts_with("//");
    let parseable = if protocol_relative {
        format!("{}{}", PLACEHOLDER_SCHEME, uri)
    } else {
        uri.to_string()
    };

    let mut url = Url::parse(&parseable)
        .map_err(|e| HypermediaError::InvalidUri(format!("{} ({})", uri, e)))?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = query_value(item) {
                            pairs.append_pair(key, &s);
                        }
                    }
                }
                other => {
                    if let Some(s) = query_value(other) {
                        pairs.append_pair(key, &s);
                    }
                }
            }
        }
    }

    let out = url.to_string();
    if protocol_relative {
        Ok(out
            .strip_prefix(PLACEHOLDER_SCHEME)
            .map(str::to_string)
            .unwrap_or(out))
    } else {
        Ok(out)
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Origin (`scheme://host[:port]`) of an absolute URI, used for middleware
/// origin filters.
pub fn origin_of(uri: &Url) -> String {
    uri.origin().ascii_serialization()
}
