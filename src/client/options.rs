use crate::error::{HypermediaError, Result};
use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use serde::Serialize;

/// Per-request overlay: method, extra headers and body.
///
/// Empty options describe a plain `GET`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Method, `GET` when unset.
    pub method: Option<Method>,
    /// Headers added to the request.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl RequestOptions {
    /// Plain `GET`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for `method`.
    pub fn method(method: Method) -> Self {
        RequestOptions {
            method: Some(method),
            ..Self::default()
        }
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header, replacing earlier values with the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a raw body and its content type.
    pub fn with_body(mut self, body: impl Into<Bytes>, content_type: &str) -> Result<Self> {
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| HypermediaError::Config(format!("invalid content type {:?}: {}", content_type, e)))?;
        self.headers.insert(CONTENT_TYPE, content_type);
        self.body = Some(body.into());
        Ok(self)
    }

    /// Serialize `value` as a JSON body.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(|e| HypermediaError::Validation(e.to_string()))?;
        self.with_body(body, crate::types::form::JSON)
    }

    /// Apply `other` on top: its method and body win when set, its headers
    /// replace same-named ones.
    pub fn merge(&mut self, other: RequestOptions) {
        if other.method.is_some() {
            self.method = other.method;
        }
        if other.body.is_some() {
            self.body = other.body;
        }
        let mut last_name = None;
        for (name, value) in other.headers {
            // HeaderMap yields None for repeated values of the previous name
            match name {
                Some(name) => {
                    self.headers.insert(name.clone(), value);
                    last_name = Some(name);
                }
                None => {
                    if let Some(name) = &last_name {
                        self.headers.append(name.clone(), value);
                    }
                }
            }
        }
    }

    /// Effective method.
    pub fn effective_method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    /// Whether these options describe a `GET` with no extra headers or body.
    pub fn is_plain_read(&self) -> bool {
        self.effective_method() == Method::GET && self.headers.is_empty() && self.body.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_read() {
        assert!(RequestOptions::new().is_plain_read());
        assert!(!RequestOptions::method(Method::DELETE).is_plain_read());
        let with_header = RequestOptions::new()
            .with_header(http::header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        assert!(!with_header.is_plain_read());
    }

    #[test]
    fn test_with_json() {
        let options = RequestOptions::method(Method::POST).with_json(&json!({"a": 1})).unwrap();
        assert_eq!(options.headers[CONTENT_TYPE], "application/json");
        assert_eq!(options.body.unwrap(), Bytes::from_static(br#"{"a":1}"#));
    }

    #[test]
    fn test_merge_overlays() {
        let mut base = RequestOptions::new()
            .with_header(http::header::ACCEPT, HeaderValue::from_static("a"))
            .with_header(http::header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        let overlay = RequestOptions::method(Method::PUT)
            .with_header(http::header::ACCEPT, HeaderValue::from_static("b"));
        base.merge(overlay);
        assert_eq!(base.method, Some(Method::PUT));
        assert_eq!(base.headers[http::header::ACCEPT], "b");
        assert_eq!(base.headers[http::header::ACCEPT_LANGUAGE], "en");
    }
}
