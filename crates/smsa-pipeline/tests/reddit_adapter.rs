//! Integration tests for `RedditAdapter::fetch` against a local mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smsa_core::UNKNOWN_AUTHOR;
use smsa_pipeline::sources::RedditAdapter;
use smsa_pipeline::{FetchError, SourceAdapter};

fn adapter(server: &MockServer, subreddits: &[&str]) -> RedditAdapter {
    RedditAdapter::new(
        "client-id",
        "client-secret",
        "smsa-test/0.1",
        subreddits.iter().map(ToString::to_string).collect(),
        Duration::from_secs(5),
    )
    .expect("failed to build test RedditAdapter")
    .with_base_urls(server.uri(), server.uri())
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "reddit-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

fn listing(ids: &[&str]) -> serde_json::Value {
    let children: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            json!({
                "kind": "t3",
                "data": {
                    "id": id,
                    "title": format!("Post {id} about rust"),
                    "selftext": format!("Body of post {id} with plenty of words"),
                    "author": "ferris",
                    "created_utc": 1_714_550_400.0,
                    "ups": 12,
                    "downs": 0,
                    "score": 12,
                    "num_comments": 4
                }
            })
        })
        .collect();
    json!({ "kind": "Listing", "data": { "children": children } })
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_searches_each_subreddit_and_keyword_with_bearer_token() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/rust/search"))
        .and(header("authorization", "Bearer reddit-token"))
        .and(query_param("q", "async"))
        .and(query_param("restrict_sr", "true"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a1"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/search"))
        .and(query_param("q", "tokio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["t1", "t2"])))
        .expect(1)
        .mount(&server)
        .await;

    let keywords = vec!["async".to_string(), "tokio".to_string()];
    let payloads = adapter(&server, &["rust"]).fetch(&keywords, 50).await.unwrap();

    assert_eq!(payloads.len(), 3);
    let first = &payloads[0];
    assert_eq!(first.id.as_deref(), Some("a1"));
    assert_eq!(first.author.as_deref(), Some("ferris"));
    assert_eq!(first.metrics.get("upvotes"), Some(&Some(12)));
    assert_eq!(first.metrics.get("num_comments"), Some(&Some(4)));
    assert_eq!(
        first.created_at.map(|t| t.timestamp()),
        Some(1_714_550_400)
    );
}

#[tokio::test]
async fn missing_author_becomes_the_deleted_placeholder() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/rust/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "children": [
                { "data": { "id": "x", "title": "orphaned post title", "selftext": "[deleted]" } }
            ] }
        })))
        .mount(&server)
        .await;

    let payloads = adapter(&server, &["rust"])
        .fetch(&["rust".to_string()], 10)
        .await
        .unwrap();

    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].author.as_deref(), Some(UNKNOWN_AUTHOR));
    assert!(payloads[0].text.is_none());
    assert_eq!(payloads[0].title.as_deref(), Some("orphaned post title"));
}

#[tokio::test]
async fn later_subreddit_failure_keeps_earlier_results() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/rust/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["ok1", "ok2"])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/programming/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let payloads = adapter(&server, &["rust", "programming"])
        .fetch(&["rust".to_string()], 10)
        .await
        .unwrap();

    assert_eq!(payloads.len(), 2);
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_credentials_map_to_unauthorized_without_searching() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthorized",
            "error": 401
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = adapter(&server, &["rust"])
        .fetch(&["rust".to_string()], 10)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Unauthorized { .. }), "got {err:?}");
}

#[tokio::test]
async fn first_search_failure_is_returned() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/rust/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = adapter(&server, &["rust"])
        .fetch(&["rust".to_string()], 10)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RateLimited { .. }), "got {err:?}");
}
