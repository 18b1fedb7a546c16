//! Cross-module tests that need no network: parsing through the content
//! type table, then navigating the parsed state.

use crate::cache::LruCache;
use crate::format::{ContentTypeMap, Format};
use crate::{Body, Client, ClientConfig, HypermediaError, State};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, LINK};
use http::{HeaderMap, HeaderValue, Method};
use serde_json::json;

fn headers(content_type: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
    headers
}

fn parse(content_type: &str, uri: &str, body: serde_json::Value) -> State {
    let format = ContentTypeMap::default().select(Some(content_type)).unwrap();
    format
        .parse(uri, &headers(content_type), Bytes::from(body.to_string()))
        .unwrap()
}

fn user_document() -> serde_json::Value {
    json!({
        "_links": {
            "self": {"href": "/api/users/1"},
            "accounts": {"href": "/api/users/1/accounts"}
        },
        "_embedded": {
            "accounts": [
                {"_links": {"self": {"href": "/api/accounts/1"}}, "balance": 10},
                {"_links": {"self": {"href": "/api/accounts/2"}}, "balance": 20}
            ]
        },
        "name": "Ada"
    })
}

#[test]
fn test_hal_selected_for_json() {
    let state = parse("application/json; charset=utf-8", "https://example.org/api/users/1", user_document());
    assert_eq!(state.data().unwrap()["name"], "Ada");
    assert!(state.data().unwrap().get("_links").is_none());
    assert_eq!(state.content_type(), Some("application/json"));
}

#[test]
fn test_embedded_accounts_without_network() {
    let state = parse("application/hal+json", "https://example.org/api/users/1", user_document());
    let accounts = state.get_embedded("accounts").unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts.as_slice()[1].uri(), "https://example.org/api/accounts/2");
    assert_eq!(accounts.as_slice()[1].data().unwrap()["balance"], 20);
}

#[tokio::test]
async fn test_follow_embedded_is_served_inline() {
    let client = Client::new().unwrap();
    let state = parse("application/hal+json", "https://example.invalid/api/users/1", user_document())
        .with_client(client);
    // example.invalid never resolves, so any request would fail
    let account = state.follow("accounts").get().await.unwrap();
    assert_eq!(account.uri(), "https://example.invalid/api/accounts/1");
}

#[tokio::test]
async fn test_follow_nonexistent_names_rel() {
    let client = Client::new().unwrap();
    let state = parse("application/hal+json", "https://example.org/", json!({
        "_links": {"self": {"href": "/"}}
    }))
    .with_client(client);

    let err = state.follow("nonexistent").get().await.unwrap_err();
    assert!(err.to_string().contains("nonexistent"));
    match err {
        HypermediaError::RelationNotFound { rel, uri } => {
            assert_eq!(rel, "nonexistent");
            assert_eq!(uri, "https://example.org/");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_siren_action_method() {
    let state = parse("application/vnd.siren+json", "https://example.org/orders/42", json!({
        "properties": {"status": "pending"},
        "actions": [{"name": "update-order", "method": "PUT", "href": "/orders/42"}]
    }));
    let action = state.action("update-order").unwrap();
    assert_eq!(action.method(), &Method::PUT);
    assert_eq!(action.uri(), "https://example.org/orders/42");
}

#[test]
fn test_link_header_merged_into_json_links() {
    let mut headers = headers("application/hal+json");
    headers.insert(LINK, HeaderValue::from_static("</help>; rel=\"help\""));
    let body = Bytes::from(json!({"_links": {"self": {"href": "/a"}}}).to_string());
    let state = Format::Hal.parse("https://example.org/a", &headers, body).unwrap();
    assert_eq!(state.links().require("help").unwrap().resolve().unwrap(), "https://example.org/help");
    assert!(state.has_link("self"));
}

#[test]
fn test_unsupported_media_type() {
    let map = ContentTypeMap::empty().with("application/hal+json", Format::Hal, 1.0);
    assert!(matches!(
        map.select(Some("image/png")),
        Err(HypermediaError::UnsupportedMediaType(ct)) if ct == "image/png"
    ));
}

#[tokio::test]
async fn test_cached_embedded_states_are_bound_on_read() {
    let client = Client::with_config(ClientConfig::default().with_cache(LruCache::new(8))).unwrap();
    let state = parse("application/hal+json", "https://example.invalid/api/users/1", user_document());
    client.cache().store(&state);
    for embedded in state.embedded_states() {
        client.cache().store(embedded);
    }

    let account = client.go("https://example.invalid/api/accounts/2").unwrap().get().await.unwrap();
    assert_eq!(account.data().unwrap()["balance"], 20);
    assert!(account.client().unwrap().ptr_eq(&client));
}

#[test]
fn test_cache_copies_are_detached() {
    let client = Client::new().unwrap();
    let state = State::new("https://example.org/x", Body::Json(json!({"v": 1}))).with_client(client.clone());
    client.cache().store(&state);
    let cached = client.cache().get("https://example.org/x").unwrap();
    assert!(cached.client().is_none());
}
