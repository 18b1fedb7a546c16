//! Warnings for responses that announce deprecation or sunset.

use super::{Middleware, Next};
use crate::error::Result;
use crate::protocol::headers::names::{DEPRECATION, SUNSET};
use async_trait::async_trait;

/// Logs a warning when a response announces deprecation (RFC 9745) or a
/// sunset date (RFC 8594).
#[derive(Debug, Clone, Copy, Default)]
pub struct DeprecationWarning;

impl DeprecationWarning {
    /// Create the middleware.
    pub fn new() -> Self {
        DeprecationWarning
    }
}

#[async_trait]
impl Middleware for DeprecationWarning {
    async fn handle(&self, request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        let response = next.run(request).await?;
        let headers = response.headers();
        let deprecation = headers.get(DEPRECATION).and_then(|v| v.to_str().ok());
        let sunset = headers.get(SUNSET).and_then(|v| v.to_str().ok());

        if deprecation.is_some() || sunset.is_some() {
            tracing::warn!(
                "Resource {} is deprecated (deprecation: {}, sunset: {})",
                response.url(),
                deprecation.unwrap_or("-"),
                sunset.unwrap_or("-")
            );
        }
        Ok(response)
    }
}
