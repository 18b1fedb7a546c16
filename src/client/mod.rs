//! Hypermedia client, resources and navigation.
//!
//! This module provides the client side of the crate, enabling callers to:
//!
//! - **Bookmark** a URI and navigate from it by link relation
//! - **Chain** relations lazily, resolving them only when awaited
//! - **Submit forms** described by the representation
//! - **Cache** parsed states, with eviction after mutations
//! - **Cancel** in-flight requests through an abort signal
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch    - Client, Fetcher and request pipeline
//! ├── resource - Resource: a URI bound to a client
//! ├── relation - Relation: a lazily resolved chain of hops
//! ├── action   - Action: a form bound to a client
//! ├── options  - Per-request overlays
//! ├── abort    - AbortController / AbortSignal
//! ├── config   - Client configuration
//! └── utils    - Status classification and invalidation helpers
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Entry point: configuration, middleware, cache |
//! | [`Resource`] | A URI bound to a client |
//! | [`Relation`] | A chain of link hops |
//! | [`Action`] | A submittable form |
//! | [`RequestOptions`] | Method, headers and body overlay |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ```ignore
//! use hypermedia_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> hypermedia_client::Result<()> {
//!     let client = Client::new()?;
//!     let root = client.go("https://api.example.org/")?;
//!
//!     // GET / then GET the `me` link
//!     let me = root.follow("me").get().await?;
//!     println!("{:?}", me.data());
//!     Ok(())
//! }
//! ```
//!
//! ## Middleware
//!
//! ```ignore
//! use hypermedia_client::middleware::BearerAuth;
//!
//! client.use_middleware(BearerAuth::new("s3cr3t")?, "https://api.example.org")?;
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use hypermedia_client::client::{is_access_denied_status, is_retryable_status};
//!
//! assert!(is_retryable_status(503));
//! assert!(!is_retryable_status(404));
//! assert!(is_access_denied_status(401));
//! ```

pub(crate) mod abort;
mod action;
mod config;
mod fetch;
mod options;
mod relation;
pub(crate) mod resource;
pub(crate) mod utils;

pub use abort::{AbortController, AbortSignal};
pub use action::{Action, SchemaPlugin};
pub use config::ClientConfig;
pub use fetch::{Client, Fetcher};
pub use options::RequestOptions;
pub use relation::Relation;
pub use resource::Resource;
pub use utils::{is_access_denied_status, is_retryable_status};
