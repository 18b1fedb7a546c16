//! Wire-level building blocks shared by the parsers and the client.
//!
//! - **[headers]**: RFC 8288 `Link` header parsing, content-type normalization,
//!   `Accept` formatting
//! - **[uri]**: relative reference resolution and query-string building
//! - **[uri_template]**: RFC 6570 template expansion

pub mod headers;
pub mod uri;
pub mod uri_template;

pub use headers::{
    content_type_of, format_media_range, links_from_headers, normalize_content_type,
    parse_link_header, INVALIDATES_REL,
};
pub use uri::{append_query, origin_of, resolve_uri};
pub use uri_template::{expand_template, is_template, Variables};
