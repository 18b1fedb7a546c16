//! Login hook invoked when a server answers 401.

use super::{Middleware, Next};
use crate::error::Result;
use async_trait::async_trait;
use http::StatusCode;
use std::fmt;
use std::sync::Arc;

type LoginCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Calls back when a request comes back `401 Unauthorized`.
///
/// The callback receives the request URI, typically to start a login flow.
/// The response itself still propagates, so the caller sees the 401 as an
/// [`HttpStatus`](crate::HypermediaError::HttpStatus) error.
#[derive(Clone)]
pub struct LoginRedirect {
    on_unauthorized: LoginCallback,
}

impl LoginRedirect {
    /// Invoke `callback` with the request URI on every 401.
    pub fn new(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        LoginRedirect {
            on_unauthorized: Arc::new(callback),
        }
    }
}

impl fmt::Debug for LoginRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRedirect").finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for LoginRedirect {
    async fn handle(&self, request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        let uri = request.url().to_string();
        let response = next.run(request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("{} requires authentication", uri);
            (self.on_unauthorized)(&uri);
        }
        Ok(response)
    }
}
