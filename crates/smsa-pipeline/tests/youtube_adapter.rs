//! Integration tests for `YoutubeAdapter::fetch` against a local mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smsa_pipeline::sources::YoutubeAdapter;
use smsa_pipeline::{FetchError, SourceAdapter};

const SEARCH_PATH: &str = "/youtube/v3/search";

fn adapter(server: &MockServer) -> YoutubeAdapter {
    YoutubeAdapter::new("yt-key", Duration::from_secs(5), "smsa-test/0.1")
        .expect("failed to build test YoutubeAdapter")
        .with_base_url(server.uri())
}

#[tokio::test]
async fn fetch_maps_snippets_and_caps_page_size() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("part", "snippet"))
        .and(query_param("type", "video"))
        .and(query_param("order", "relevance"))
        .and(query_param("q", "rust OR wasm"))
        .and(query_param("maxResults", "50"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": { "kind": "youtube#video", "videoId": "vid-1" },
                "snippet": {
                    "title": "Rust in 100 seconds",
                    "description": "A quick tour of the language",
                    "channelTitle": "Fireship",
                    "publishedAt": "2025-04-30T18:00:00Z"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keywords = vec!["rust".to_string(), "wasm".to_string()];
    let payloads = adapter(&server).fetch(&keywords, 200).await.unwrap();

    assert_eq!(payloads.len(), 1);
    let video = &payloads[0];
    assert_eq!(video.id.as_deref(), Some("vid-1"));
    assert_eq!(video.title.as_deref(), Some("Rust in 100 seconds"));
    assert_eq!(video.description.as_deref(), Some("A quick tour of the language"));
    assert_eq!(video.author.as_deref(), Some("Fireship"));
    assert!(video.text.is_none());
    assert!(video.metrics.is_empty());
    assert!(video.created_at.is_some());
}

#[tokio::test]
async fn unparseable_publish_date_is_left_unset() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": { "videoId": "v" }, "snippet": { "title": "t", "publishedAt": "yesterday" } }]
        })))
        .mount(&server)
        .await;

    let payloads = adapter(&server)
        .fetch(&["rust".to_string()], 5)
        .await
        .unwrap();

    assert!(payloads[0].created_at.is_none());
}

#[tokio::test]
async fn quota_exhaustion_maps_to_forbidden() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "quotaExceeded" }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .fetch(&["rust".to_string()], 5)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Forbidden { .. }), "got {err:?}");
    assert!(err.to_string().contains("quotaExceeded"));
}
