//! Cookie-based credentials.
//!
//! Servers that authenticate with session cookies expect the client to send
//! back whatever `Set-Cookie` handed out. [`CookieCredentials`] keeps one
//! cookie set per origin and replays it on every later request to that
//! origin. `Set-Cookie` values are parsed with the [`cookie`] crate; a
//! `Max-Age` of zero or an `Expires` date in the past removes the stored
//! cookie, and cookies whose expiry passes while stored stop being sent.
//! `Path` and `Domain` are not consulted.

use super::{Middleware, Next};
use crate::error::Result;
use crate::protocol::origin_of;
use async_trait::async_trait;
use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Per-origin cookie jar.
#[derive(Debug, Default)]
pub struct CookieCredentials {
    jars: Mutex<HashMap<String, BTreeMap<String, Cookie<'static>>>>,
}

impl CookieCredentials {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cookies stored for `origin` as `(name, value)` pairs.
    pub fn cookies_for(&self, origin: &str) -> Vec<(String, String)> {
        self.jars
            .lock()
            .get(origin)
            .map(|jar| {
                jar.values()
                    .map(|c| (c.name().to_string(), c.value().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store a cookie for `origin`, replacing one with the same name.
    pub fn insert(&self, origin: &str, name: &str, value: &str) {
        self.jars
            .lock()
            .entry(origin.to_string())
            .or_default()
            .insert(name.to_string(), Cookie::new(name.to_string(), value.to_string()));
    }

    /// Forget every cookie.
    pub fn clear(&self) {
        self.jars.lock().clear();
    }

    fn cookie_header(&self, origin: &str) -> Option<HeaderValue> {
        let mut jars = self.jars.lock();
        let jar = jars.get_mut(origin)?;
        let now = OffsetDateTime::now_utc();
        jar.retain(|_, cookie| !is_expired(cookie, now));
        if jar.is_empty() {
            return None;
        }
        let header = jar
            .values()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&header) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Failed to build Cookie header for {}: {}", origin, e);
                None
            }
        }
    }

    fn absorb(&self, origin: &str, headers: &HeaderMap) {
        let mut jars = self.jars.lock();
        let now = OffsetDateTime::now_utc();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                warn!("Ignoring non-UTF8 Set-Cookie header from {}", origin);
                continue;
            };
            let cookie = match Cookie::parse(value.to_string()) {
                Ok(cookie) => cookie.into_owned(),
                Err(e) => {
                    warn!("Ignoring unparseable Set-Cookie header from {}: {}", origin, e);
                    continue;
                }
            };
            let jar = jars.entry(origin.to_string()).or_default();
            if is_expired(&cookie, now) {
                debug!("Removing expired cookie {} for {}", cookie.name(), origin);
                jar.remove(cookie.name());
            } else {
                debug!("Storing cookie {} for {}", cookie.name(), origin);
                jar.insert(cookie.name().to_string(), cookie);
            }
        }
    }
}

/// `Max-Age` wins over `Expires` when both are present.
fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    if let Some(max_age) = cookie.max_age() {
        return max_age <= Duration::ZERO;
    }
    cookie.expires_datetime().is_some_and(|expires| expires <= now)
}

#[async_trait]
impl Middleware for CookieCredentials {
    async fn handle(&self, mut request: reqwest::Request, next: Next<'_>) -> Result<reqwest::Response> {
        let origin = origin_of(request.url());
        if !request.headers().contains_key(COOKIE) {
            if let Some(header) = self.cookie_header(&origin) {
                request.headers_mut().insert(COOKIE, header);
            }
        }

        let response = next.run(request).await?;
        self.absorb(&origin, response.headers());
        Ok(response)
    }
}
