//! Shared header parsing and formatting.
//!
//! # Header Formats
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Link | [RFC 8288] link-values, comma-separated | `</next>; rel="next", </a>; rel="author"` |
//! | Content-Type | media type with optional parameters | `application/hal+json; charset=utf-8` |
//! | Accept | media ranges with quality weights | `application/hal+json;q=0.9, */*;q=0.1` |
//!
//! # Examples
//!
//! ```
//! use hypermedia_client::protocol::{parse_link_header, normalize_content_type};
//!
//! let links = parse_link_header(r#"</page/2>; rel="next""#, "https://example.org/page/1");
//! assert_eq!(links[0].rel, "next");
//! assert_eq!(links[0].resolve().unwrap(), "https://example.org/page/2");
//!
//! assert_eq!(normalize_content_type("Application/HAL+JSON; charset=utf-8"), "application/hal+json");
//! ```
//!
//! [RFC 8288]: https://datatracker.ietf.org/doc/html/rfc8288

use crate::types::Link;
use http::HeaderMap;
use tracing::warn;

/// Header names that `http::header` does not provide.
pub mod names {
    /// `Deprecation` (RFC 9745)
    pub const DEPRECATION: &str = "deprecation";
    /// `Sunset` (RFC 8594)
    pub const SUNSET: &str = "sunset";
}

/// Relation used by servers to list URIs whose cached copies became stale.
pub const INVALIDATES_REL: &str = "invalidates";

/// Parse a `Link` header value into links.
///
/// Every link-value becomes one [`Link`] per relation type listed in its
/// `rel` parameter, so `rel="next last"` yields two links. Entries with the
/// same relation are kept as separate links in header order. Link-values
/// without a `rel` parameter or without a `<uri-reference>` are skipped.
///
/// `context` is the URI of the response carrying the header. Targets are
/// stored unresolved and resolved against it on demand.
pub fn parse_link_header(value: &str, context: &str) -> Vec<Link> {
    let mut links = Vec::new();

    for entry in split_outside(value, ',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match parse_link_value(entry, context) {
            Some(parsed) => links.extend(parsed),
            None => warn!("Skipping unparseable Link header entry: {}", entry),
        }
    }

    links
}

/// Parse every `Link` header in a header map.
pub fn links_from_headers(headers: &HeaderMap, context: &str) -> Vec<Link> {
    headers
        .get_all(http::header::LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| parse_link_header(v, context))
        .collect()
}

fn parse_link_value(entry: &str, context: &str) -> Option<Vec<Link>> {
    let rest = entry.strip_prefix('<')?;
    let close = rest.find('>')?;
    let href = rest[..close].trim();
    let params = &rest[close + 1..];

    let mut rels: Vec<String> = Vec::new();
    let mut template = Link::new(context, "", href);

    for param in split_outside(params, ';') {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let (key, value) = match param.find('=') {
            Some(eq) => (param[..eq].trim(), unquote(param[eq + 1..].trim())),
            None => (param, String::new()),
        };

        match key.to_ascii_lowercase().as_str() {
            // RFC 8288 3.3: only the first occurrence of rel is honoured
            "rel" if rels.is_empty() => {
                rels = value.split_whitespace().map(str::to_string).collect();
            }
            "title" => template.title = Some(value),
            "type" => template.content_type = Some(value),
            "anchor" => template.anchor = Some(value),
            "hreflang" => template.hreflang = Some(value),
            "media" => template.media = Some(value),
            "name" => template.name = Some(value),
            _ => {}
        }
    }

    if rels.is_empty() {
        return None;
    }

    Some(
        rels.into_iter()
            .map(|rel| Link {
                rel,
                ..template.clone()
            })
            .collect(),
    )
}

/// Split on `sep`, ignoring separators inside `<...>` and quoted strings.
fn split_outside(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' if !in_angle => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            c if c == sep && !in_quotes && !in_angle => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Normalize a `Content-Type` value: strip parameters, trim and lowercase.
#[inline]
pub fn normalize_content_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Normalized content type of a header map, if present.
pub fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(normalize_content_type)
        .filter(|ct| !ct.is_empty())
}

/// Format a media range with its quality weight for an `Accept` header.
#[inline]
pub fn format_media_range(content_type: &str, quality: f32) -> String {
    format!("{};q={}", content_type, format_quality(quality))
}

fn format_quality(quality: f32) -> String {
    let q = quality.clamp(0.0, 1.0);
    let formatted = format!("{:.3}", q);
    let trimmed = formatted.trim_end_matches('0');
    match trimmed.strip_suffix('.') {
        Some(whole) => format!("{}.0", whole),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: &str = "https://example.org/articles/";

    #[test]
    fn test_parse_single_link() {
        let links = parse_link_header(r#"</articles/2>; rel="next""#, CTX);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/articles/2");
        assert_eq!(links[0].rel, "next");
        assert_eq!(links[0].context, CTX);
    }

    #[test]
    fn test_parse_multiple_rels_fan_out() {
        let links = parse_link_header(r#"</a>; rel="next last""#, CTX);
        let rels: Vec<_> = links.iter().map(|l| l.rel.as_str()).collect();
        assert_eq!(rels, vec!["next", "last"]);
        assert!(links.iter().all(|l| l.href == "/a"));
    }

    #[test]
    fn test_same_rel_entries_stay_distinct() {
        let links = parse_link_header(r#"</a>; rel="item", </b>; rel="item""#, CTX);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "/a");
        assert_eq!(links[1].href, "/b");
    }

    #[test]
    fn test_comma_inside_quotes_and_uri() {
        let links = parse_link_header(
            r#"</search?a=1,2>; rel="search"; title="one, two", </x>; rel=author"#,
            CTX,
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "/search?a=1,2");
        assert_eq!(links[0].title.as_deref(), Some("one, two"));
        assert_eq!(links[1].rel, "author");
    }

    #[test]
    fn test_parameters() {
        let links = parse_link_header(
            r##"<https://cdn.example/a.css>; rel=stylesheet; type="text/css"; hreflang=en; media="screen"; anchor="#top""##,
            CTX,
        );
        let link = &links[0];
        assert_eq!(link.content_type.as_deref(), Some("text/css"));
        assert_eq!(link.hreflang.as_deref(), Some("en"));
        assert_eq!(link.media.as_deref(), Some("screen"));
        assert_eq!(link.anchor.as_deref(), Some("#top"));
    }

    #[test]
    fn test_escaped_quote_in_title() {
        let links = parse_link_header(r#"</a>; rel="x"; title="say \"hi\"""#, CTX);
        assert_eq!(links[0].title.as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_skips_entries_without_rel() {
        let links = parse_link_header(r#"</a>; title="no rel", </b>; rel="ok""#, CTX);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/b");
    }

    #[test]
    fn test_skips_garbage() {
        assert!(parse_link_header("not a link", CTX).is_empty());
        assert!(parse_link_header("", CTX).is_empty());
    }

    #[test]
    fn test_links_from_headers() {
        let mut headers = HeaderMap::new();
        headers.append(http::header::LINK, r#"</a>; rel="a""#.parse().unwrap());
        headers.append(http::header::LINK, r#"</b>; rel="b""#.parse().unwrap());
        let links = links_from_headers(&headers, CTX);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn test_normalize_content_type() {
        assert_eq!(normalize_content_type("application/json"), "application/json");
        assert_eq!(
            normalize_content_type(" Application/Vnd.Siren+JSON ; charset=UTF-8"),
            "application/vnd.siren+json"
        );
    }

    #[test]
    fn test_format_media_range() {
        assert_eq!(format_media_range("application/hal+json", 0.9), "application/hal+json;q=0.9");
        assert_eq!(format_media_range("application/prs.hal-forms+json", 1.0), "application/prs.hal-forms+json;q=1.0");
        assert_eq!(format_media_range("*/*", 0.125), "*/*;q=0.125");
    }
}
