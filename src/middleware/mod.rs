//! Request middleware.
//!
//! Every request the client sends runs through an ordered chain of
//! [`Middleware`]. Each middleware may rewrite the request, short-circuit
//! with its own response, or call [`Next::run`] to continue down the chain
//! and inspect the response on the way back.
//!
//! ```text
//! request → accept → mw1 → mw2 → ... → reqwest
//! ```
//!
//! Middleware is registered together with an origin pattern and only runs
//! for requests whose origin (`scheme://host[:port]`) matches it. `*`
//! matches any run of characters, so `"*"` applies everywhere and
//! `"https://*.example.org"` applies to every subdomain over TLS.
//!
//! # Built-in middleware
//!
//! | Type | Effect |
//! |------|--------|
//! | [`AcceptHeader`] | sets `Accept` from the content type table (installed automatically) |
//! | [`BasicAuth`] | `Authorization: Basic ...` |
//! | [`BearerAuth`] | `Authorization: Bearer ...` |
//! | [`ApiKey`] | a static key in a custom header |
//! | [`CookieCredentials`] | stores `Set-Cookie` and replays cookies per origin |
//! | [`LoginRedirect`] | invokes a callback on `401 Unauthorized` |
//! | [`DeprecationWarning`] | logs `Deprecation` / `Sunset` response headers |
//!
//! # Writing middleware
//!
//! ```
//! use async_trait::async_trait;
//! use hypermedia_client::middleware::{Middleware, Next};
//! use hypermedia_client::Result;
//!
//! struct RequestId;
//!
//! #[async_trait]
//! impl Middleware for RequestId {
//!     async fn handle(&self, mut request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
//!         request.headers_mut().insert("x-request-id", http::HeaderValue::from_static("42"));
//!         next.run(request).await
//!     }
//! }
//! ```

mod accept;
mod auth;
mod credentials;
mod deprecation;
mod login;

pub use self::accept::AcceptHeader;
pub use self::auth::{ApiKey, BasicAuth, BearerAuth};
pub use self::credentials::CookieCredentials;
pub use self::deprecation::DeprecationWarning;
pub use self::login::LoginRedirect;

use crate::error::{HypermediaError, Result};
use crate::protocol::origin_of;
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A step in the request pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle `request`, usually by delegating to `next`.
    async fn handle(&self, request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response>;
}

/// The remainder of the pipeline after the current middleware.
pub struct Next<'a> {
    client: &'a reqwest::Client,
    chain: &'a [Registered],
}

impl<'a> Next<'a> {
    pub(crate) fn new(client: &'a reqwest::Client, chain: &'a [Registered]) -> Self {
        Next { client, chain }
    }

    /// Pass `request` to the next middleware whose origin filter matches,
    /// or send it when none is left.
    pub async fn run(self, request: reqwest::Request) -> Result<reqwest::Response> {
        let mut chain = self.chain;
        while let Some((current, rest)) = chain.split_first() {
            if current.filter.matches(request.url()) {
                let next = Next {
                    client: self.client,
                    chain: rest,
                };
                return current.middleware.handle(request, next).await;
            }
            chain = rest;
        }

        tracing::debug!("{} {}", request.method(), request.url());
        Ok(self.client.execute(request).await?)
    }
}

/// Glob over request origins.
#[derive(Clone)]
pub struct OriginFilter {
    pattern: String,
    // None matches every origin
    regex: Option<Regex>,
}

impl OriginFilter {
    /// Compile a pattern; `*` matches any run of characters.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            return Ok(Self::any());
        }
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))
            .map_err(|e| HypermediaError::Config(format!("invalid origin pattern {:?}: {}", pattern, e)))?;
        Ok(OriginFilter {
            pattern: pattern.to_string(),
            regex: Some(regex),
        })
    }

    /// Filter matching every origin.
    pub fn any() -> Self {
        OriginFilter {
            pattern: "*".to_string(),
            regex: None,
        }
    }

    /// Whether requests to `url` are covered.
    pub fn matches(&self, url: &Url) -> bool {
        self.regex
            .as_ref()
            .map_or(true, |regex| regex.is_match(&origin_of(url)))
    }

    /// The pattern as registered.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for OriginFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OriginFilter").field(&self.pattern).finish()
    }
}

/// A middleware with its origin filter.
#[derive(Clone)]
pub(crate) struct Registered {
    middleware: Arc<dyn Middleware>,
    filter: OriginFilter,
}

impl Registered {
    pub(crate) fn new(middleware: Arc<dyn Middleware>, filter: OriginFilter) -> Self {
        Registered { middleware, filter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_origin_filter_glob() {
        let filter = OriginFilter::new("https://*.example.org").unwrap();
        assert!(filter.matches(&url("https://api.example.org/users")));
        assert!(!filter.matches(&url("http://api.example.org/users")));
        assert!(!filter.matches(&url("https://example.com/")));
    }

    #[test]
    fn test_origin_filter_exact_with_port() {
        let filter = OriginFilter::new("http://127.0.0.1:8080").unwrap();
        assert!(filter.matches(&url("http://127.0.0.1:8080/a")));
        assert!(!filter.matches(&url("http://127.0.0.1:8081/a")));
    }

    #[test]
    fn test_origin_filter_escapes_dots() {
        let filter = OriginFilter::new("https://example.org").unwrap();
        assert!(!filter.matches(&url("https://exampleXorg/")));
    }

    #[test]
    fn test_any() {
        assert!(OriginFilter::any().matches(&url("https://anything.test/")));
        assert!(OriginFilter::new("*").unwrap().matches(&url("http://localhost:1/")));
    }
}
