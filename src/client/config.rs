//! Client configuration.

use crate::cache::{Cache, ForeverCache};
use crate::client::SchemaPlugin;
use crate::error::{HypermediaError, Result};
use crate::format::ContentTypeMap;
use std::fmt;
use std::sync::Arc;

/// Configuration for a [`Client`](crate::Client).
///
/// Every field has a default, so a client can be built with
/// `ClientConfig::default()` and only the bookmark URI passed to
/// [`Client::go`](crate::Client::go).
///
/// | Variable | Field | Default |
/// |----------|-------|---------|
/// | `HYPERMEDIA_BASE_URL` | `base_url` | (absent) |
/// | `HYPERMEDIA_TIMEOUT_MS` | `request_timeout_ms` | `30000` |
/// | `HYPERMEDIA_PROXY` | `proxy_url` | (none) |
/// | `HYPERMEDIA_SEND_USER_AGENT` | `send_user_agent` | `true` |
#[derive(Clone)]
pub struct ClientConfig {
    /// Root against which relative bookmark URIs are resolved.
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds. Expiry surfaces as a transport
    /// error.
    pub request_timeout_ms: u64,
    /// Send a `User-Agent` header.
    pub send_user_agent: bool,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Proxy for every request; empty for none.
    pub proxy_url: String,
    /// Log request flow and cache activity at debug level.
    pub enable_logging: bool,
    /// Content type to format table, also used for `Accept`.
    pub content_type_map: ContentTypeMap,
    /// Cache for parsed states.
    pub cache: Arc<dyn Cache>,
    /// Extra validation run before a form is submitted.
    pub schema_plugin: Option<Arc<dyn SchemaPlugin>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: 30_000,
            send_user_agent: true,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy_url: String::new(),
            enable_logging: true,
            content_type_map: ContentTypeMap::default(),
            cache: Arc::new(ForeverCache::new()),
            schema_plugin: None,
        }
    }
}

impl ClientConfig {
    /// Populate config from environment variables, applying defaults where
    /// absent.
    ///
    /// Fails when a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.base_url = std::env::var("HYPERMEDIA_BASE_URL").ok().filter(|v| !v.is_empty());

        if let Ok(value) = std::env::var("HYPERMEDIA_TIMEOUT_MS") {
            config.request_timeout_ms = value.trim().parse().map_err(|_| {
                HypermediaError::Config(format!("HYPERMEDIA_TIMEOUT_MS must be an integer, got {:?}", value))
            })?;
        }

        if let Ok(value) = std::env::var("HYPERMEDIA_PROXY") {
            config.proxy_url = value;
        }

        if let Ok(value) = std::env::var("HYPERMEDIA_SEND_USER_AGENT") {
            config.send_user_agent = parse_flag(&value).ok_or_else(|| {
                HypermediaError::Config(format!("HYPERMEDIA_SEND_USER_AGENT must be a boolean, got {:?}", value))
            })?;
        }

        Ok(config)
    }

    /// Use `cache` for parsed states.
    pub fn with_cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Run `plugin` before every form submission.
    pub fn with_schema_plugin(mut self, plugin: impl SchemaPlugin + 'static) -> Self {
        self.schema_plugin = Some(Arc::new(plugin));
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("send_user_agent", &self.send_user_agent)
            .field("user_agent", &self.user_agent)
            .field("proxy_url", &self.proxy_url)
            .field("enable_logging", &self.enable_logging)
            .field("content_type_map", &self.content_type_map)
            .field("schema_plugin", &self.schema_plugin.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout_ms, 30_000);
        assert!(config.send_user_agent);
        assert!(config.user_agent.starts_with("hypermedia_client/"));
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    // Only test that touches the process environment.
    #[test]
    fn test_from_env() {
        std::env::set_var("HYPERMEDIA_BASE_URL", "https://api.example.org/");
        std::env::set_var("HYPERMEDIA_TIMEOUT_MS", "1500");
        std::env::set_var("HYPERMEDIA_SEND_USER_AGENT", "no");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.org/"));
        assert_eq!(config.request_timeout_ms, 1500);
        assert!(!config.send_user_agent);

        std::env::set_var("HYPERMEDIA_TIMEOUT_MS", "soon");
        assert!(matches!(ClientConfig::from_env(), Err(HypermediaError::Config(_))));

        std::env::remove_var("HYPERMEDIA_BASE_URL");
        std::env::remove_var("HYPERMEDIA_TIMEOUT_MS");
        std::env::remove_var("HYPERMEDIA_SEND_USER_AGENT");
    }
}
