//! Content negotiation through the `Accept` header.

use super::{Middleware, Next};
use crate::error::{HypermediaError, Result};
use crate::format::ContentTypeMap;
use async_trait::async_trait;
use http::header::ACCEPT;
use http::HeaderValue;

/// Sets `Accept` to every registered content type, weighted by quality.
///
/// A request that already carries an `Accept` header is left alone.
#[derive(Debug, Clone)]
pub struct AcceptHeader {
    value: HeaderValue,
}

impl AcceptHeader {
    /// Build the header from a content type table.
    pub fn new(map: &ContentTypeMap) -> Result<Self> {
        let value = HeaderValue::from_str(&map.accept_header())
            .map_err(|e| HypermediaError::Config(format!("invalid Accept header: {}", e)))?;
        Ok(AcceptHeader { value })
    }

    /// The header value sent.
    pub fn value(&self) -> &HeaderValue {
        &self.value
    }
}

#[async_trait]
impl Middleware for AcceptHeader {
    async fn handle(&self, mut request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        if !request.headers().contains_key(ACCEPT) {
            request.headers_mut().insert(ACCEPT, self.value.clone());
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test]
    fn test_value_from_table() {
        let map = ContentTypeMap::empty()
            .with("application/hal+json", Format::Hal, 1.0)
            .with("text/*", Format::Text, 0.5);
        let accept = AcceptHeader::new(&map).unwrap();
        assert_eq!(accept.value(), "application/hal+json;q=1.0, text/*;q=0.5");
    }
}
