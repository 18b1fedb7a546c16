//! Static credentials.

use super::{Middleware, Next};
use crate::error::{HypermediaError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::{HeaderName, AUTHORIZATION};
use http::HeaderValue;

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| HypermediaError::Config(format!("invalid credential header: {}", e)))?;
    header.set_sensitive(true);
    Ok(header)
}

/// HTTP Basic authentication.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    header: HeaderValue,
}

impl BasicAuth {
    /// Credentials sent as `Authorization: Basic base64(user:password)`.
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let encoded = STANDARD.encode(format!("{}:{}", username, password));
        Ok(BasicAuth {
            header: sensitive(&format!("Basic {}", encoded))?,
        })
    }
}

#[async_trait]
impl Middleware for BasicAuth {
    async fn handle(&self, mut request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        request.headers_mut().insert(AUTHORIZATION, self.header.clone());
        next.run(request).await
    }
}

/// Bearer token authentication.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    header: HeaderValue,
}

impl BearerAuth {
    /// Token sent as `Authorization: Bearer <token>`.
    pub fn new(token: &str) -> Result<Self> {
        Ok(BearerAuth {
            header: sensitive(&format!("Bearer {}", token))?,
        })
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, mut request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        request.headers_mut().insert(AUTHORIZATION, self.header.clone());
        next.run(request).await
    }
}

/// A fixed key sent in a custom header, e.g. `X-Api-Key`.
#[derive(Debug, Clone)]
pub struct ApiKey {
    name: HeaderName,
    value: HeaderValue,
}

impl ApiKey {
    /// Send `key` in header `name`.
    pub fn new(name: &str, key: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HypermediaError::Config(format!("invalid header name {:?}: {}", name, e)))?;
        Ok(ApiKey {
            name,
            value: sensitive(key)?,
        })
    }
}

#[async_trait]
impl Middleware for ApiKey {
    async fn handle(&self, mut request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        request.headers_mut().insert(self.name.clone(), self.value.clone());
        next.run(request).await
    }
}
