//! Bodies the client does not interpret.
//!
//! Opaque states carry only the links found in the `Link` header; those are
//! attached by the caller together with the other response metadata.

use crate::error::HypermediaError;
use crate::types::{Body, State, StreamBody};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Chunks buffered between the network and the consumer of a stream body.
const STREAM_BUFFER: usize = 16;

/// State with a binary body.
pub fn binary(uri: &str, body: Bytes) -> State {
    State::new(uri, Body::Binary(body))
}

/// State with a text body. Invalid UTF-8 is replaced.
pub fn text(uri: &str, body: Bytes) -> State {
    State::new(uri, Body::Text(String::from_utf8_lossy(&body).into_owned()))
}

/// State with no body, used for `HEAD` and empty responses.
pub fn empty(uri: &str) -> State {
    State::new(uri, Body::Empty)
}

/// State whose body streams the response.
///
/// A background task pumps chunks into a bounded channel and stops when the
/// consumer drops the stream or the transport fails. Must be called inside a
/// tokio runtime.
pub fn stream(uri: &str, response: reqwest::Response) -> State {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let mut chunks = response.bytes_stream();
    let source = uri.to_string();

    tokio::spawn(async move {
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(HypermediaError::from);
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() {
                tracing::debug!("Stream consumer for {} went away", source);
                return;
            }
            if failed {
                return;
            }
        }
    });

    State::new(uri, Body::Stream(StreamBody::new(ReceiverStream::new(rx))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lossy() {
        let state = text("https://example.org/t", Bytes::from_static(b"caf\xc3\xa9 \xff"));
        assert_eq!(state.text(), Some("café \u{fffd}"));
    }

    #[test]
    fn test_binary_and_empty() {
        let state = binary("https://example.org/b", Bytes::from_static(&[0, 1, 2]));
        assert_eq!(state.bytes().unwrap().as_ref(), &[0, 1, 2]);
        assert_eq!(empty("https://example.org/e").body(), &Body::Empty);
    }
}
