#![warn(missing_docs)]

//! # Hypermedia client
//!
//! A client for HTTP APIs that describe themselves through links and forms.
//! Callers start from one bookmark URI and navigate by link relation name
//! instead of hard-coding URLs.
//!
//! ## Overview
//!
//! Responses in any supported format are parsed into one uniform [`State`]:
//!
//! 1. **Body** - the data with the format's envelope removed
//! 2. **Links** - typed links keyed by relation, including `Link` headers
//! 3. **Embedded** - sub-states shipped inline, also cached under their own URI
//! 4. **Forms** - described state transitions, submitted as [`Action`]s
//!
//! ## Supported Formats
//!
//! | Content type | Format |
//! |--------------|--------|
//! | `application/hal+json`, `application/json` | HAL |
//! | `application/vnd.api+json` | JSON:API |
//! | `application/vnd.siren+json` | Siren |
//! | `text/*` | text |
//! | anything else | binary |
//!
//! ## Usage
//!
//! ```ignore
//! use hypermedia_client::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new()?;
//!     let root = client.go("https://api.example.org/")?;
//!
//!     // Nothing is fetched until the chain is awaited
//!     let article = root
//!         .follow("articles")
//!         .follow_with("article", [("id", 42)])
//!         .get()
//!         .await?;
//!     println!("{:?}", article.data());
//!
//!     // Submit a form described by the representation
//!     let mut values = serde_json::Map::new();
//!     values.insert("title".into(), "Renamed".into());
//!     article.action("rename")?.submit(values).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Links, forms and parsed states
//! - **[error]** - Error types and result handling
//! - **[client]** - Client, resources, relations and actions
//! - **[format]** - HAL, JSON:API, Siren and opaque parsers
//! - **[cache]** - Forever, short-lived, LRU and no-op caches
//! - **[middleware]** - Request pipeline and built-in middleware
//! - **[protocol]** - `Link` headers, URI resolution and templates

pub mod cache;
pub mod client;
pub mod error;
pub mod format;
pub mod middleware;
pub mod protocol;
pub mod types;

pub use client::{
    AbortController, AbortSignal, Action, Client, ClientConfig, Relation, RequestOptions, Resource,
    SchemaPlugin,
};
pub use error::{HypermediaError, Result};
pub use types::{Body, ByteStream, Embedded, Field, FieldType, Form, Link, Links, State, StreamBody};

#[cfg(test)]
mod tests;
