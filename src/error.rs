//! Error types for hypermedia navigation.
//!
//! Every fallible operation in the crate returns [`Result`], an alias over
//! [`HypermediaError`].
//!
//! # Error Categories
//!
//! | Category | Variants | Retryable |
//! |----------|----------|-----------|
//! | Navigation | `RelationNotFound`, `ActionNotFound` | No |
//! | Representation | `MalformedRepresentation`, `UnsupportedMediaType` | No |
//! | Network | `Transport` | Yes |
//! | Server | `HttpStatus` | 408, 425, 429, 502, 503, 504 |
//! | Control | `Cancelled` | No |
//! | Input | `InvalidUri`, `Validation`, `Config` | No |
//!
//! The client never retries on its own. [`HypermediaError::is_retryable()`]
//! is there for callers that wrap requests in their own retry policy.
//!
//! # Examples
//!
//! ```
//! use hypermedia_client::HypermediaError;
//!
//! let err = HypermediaError::RelationNotFound {
//!     rel: "author".into(),
//!     uri: "https://example.org/articles/1".into(),
//! };
//! assert!(err.to_string().contains("author"));
//! assert!(!err.is_retryable());
//! ```

use bytes::Bytes;
use thiserror::Error;

/// Result type for hypermedia operations.
pub type Result<T> = std::result::Result<T, HypermediaError>;

/// Errors that can occur while fetching, parsing or navigating resources.
///
/// The type is `Clone` so a single in-flight refresh can hand the same
/// outcome to every caller waiting on it.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum HypermediaError {
    /// A link, embedded resource or form with this relation does not exist
    /// on the representation.
    #[error("Relation \"{rel}\" not found on {uri}")]
    RelationNotFound {
        /// The relation that was requested.
        rel: String,
        /// URI of the representation that was searched.
        uri: String,
    },

    /// No parser is registered for the response's content type.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The response body does not follow its format's structure.
    #[error("Malformed representation at `{field}`: {reason}")]
    MalformedRepresentation {
        /// Path of the offending member, e.g. `actions[0].href`.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Network failure, connection error or request timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {uri}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// URI that was requested.
        uri: String,
        /// Raw response body.
        body: Bytes,
    },

    /// No form/action with this name (or method) exists on the representation.
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// The navigation was aborted through an [`AbortSignal`](crate::AbortSignal).
    #[error("Request cancelled")]
    Cancelled,

    /// A URI could not be parsed or resolved.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Submitted form values were rejected before sending.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid client configuration or an unbound state.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HypermediaError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HypermediaError::MalformedRepresentation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn relation_not_found(rel: impl Into<String>, uri: impl Into<String>) -> Self {
        HypermediaError::RelationNotFound {
            rel: rel.into(),
            uri: uri.into(),
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// Returns `true` for transport failures and for HTTP 408, 425, 429,
    /// 502, 503 and 504.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            HypermediaError::Transport(_) => true,
            HypermediaError::HttpStatus { status, .. } => {
                crate::client::is_retryable_status(*status)
            }
            _ => false,
        }
    }

    /// Check if this is an HTTP 401 or 403 response.
    #[inline]
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            HypermediaError::HttpStatus { status, .. } if crate::client::is_access_denied_status(*status)
        )
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            HypermediaError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HypermediaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HypermediaError::Transport(format!("request timed out: {}", err))
        } else {
            HypermediaError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for HypermediaError {
    fn from(err: url::ParseError) -> Self {
        HypermediaError::InvalidUri(err.to_string())
    }
}
