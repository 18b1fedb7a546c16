//! Core data model: links, forms and parsed states.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Link`] | A typed link with unresolved `href` and its context URI |
//! | [`Links`] | Multi-map of links keyed by relation |
//! | [`Form`] / [`Field`] | Described state transition and its inputs |
//! | [`State`] | Parsed representation: body, links, embedded, forms, collection |

pub mod form;
pub mod link;
pub mod state;

pub use form::{EncodedForm, Field, FieldType, Form};
pub use link::{Link, Links};
pub use state::{Body, ByteStream, Embedded, State, StreamBody};
