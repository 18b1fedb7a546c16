//! Small helpers shared by the client types.

use crate::error::Result;
use crate::protocol::{links_from_headers, resolve_uri, INVALIDATES_REL};
use http::header::{CONTENT_LOCATION, LOCATION};
use http::HeaderMap;

/// Check if status code indicates retryable error
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 502 | 503 | 504)
}

/// Check if status code indicates access denied
pub fn is_access_denied_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Absolute `Location` of a response, resolved against the request URI.
pub(crate) fn location(headers: &HeaderMap, base: &str) -> Result<Option<String>> {
    header_uri(headers, LOCATION, base)
}

fn header_uri(headers: &HeaderMap, name: http::HeaderName, base: &str) -> Result<Option<String>> {
    match headers.get(name).and_then(|v| v.to_str().ok()) {
        Some(value) => resolve_uri(base, value.trim()).map(Some),
        None => Ok(None),
    }
}

/// URIs whose cached copies a mutation response makes stale: the request
/// target, `Location`, `Content-Location` and every `rel="invalidates"`
/// link.
pub(crate) fn stale_uris(target: &str, headers: &HeaderMap) -> Vec<String> {
    let mut uris = vec![target.to_string()];
    for name in [LOCATION, CONTENT_LOCATION] {
        match header_uri(headers, name, target) {
            Ok(Some(uri)) => uris.push(uri),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unresolvable header on {}: {}", target, e),
        }
    }
    for link in links_from_headers(headers, target) {
        if link.rel == INVALIDATES_REL {
            match link.resolve() {
                Ok(uri) => uris.push(uri),
                Err(e) => tracing::warn!("Ignoring invalidates link {}: {}", link.href, e),
            }
        }
    }
    uris.dedup();
    uris
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_is_access_denied_status() {
        assert!(is_access_denied_status(401));
        assert!(is_access_denied_status(403));
        assert!(!is_access_denied_status(500));
    }

    #[test]
    fn test_stale_uris() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/orders/43"));
        headers.insert(
            http::header::LINK,
            HeaderValue::from_static("</orders>; rel=\"invalidates\", </help>; rel=\"help\""),
        );
        let uris = stale_uris("https://example.org/orders/42", &headers);
        assert_eq!(
            uris,
            vec![
                "https://example.org/orders/42",
                "https://example.org/orders/43",
                "https://example.org/orders",
            ]
        );
    }

    #[test]
    fn test_location_missing() {
        assert_eq!(location(&HeaderMap::new(), "https://example.org/").unwrap(), None);
    }
}
