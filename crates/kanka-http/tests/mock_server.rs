//! The full client over HTTP against a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use kanka_core::{
    ApiUrl, ClientConfig, EmbedOptions, EmbeddedImages, Error, Fields, KankaClient, ListOptions,
    RetryPolicy,
};
use kanka_http::ReqwestTransport;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAMPAIGN: &str = "/1.0/campaigns/123";

fn client_for(server: &MockServer) -> KankaClient {
    let api = ApiUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap();
    let config = ClientConfig::new("test-token", 123).with_api_url(api);
    KankaClient::new(config, Arc::new(ReqwestTransport::new().unwrap()))
}

fn endpoint(suffix: &str) -> String {
    format!("{}/{}", CAMPAIGN, suffix)
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_create_character() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(endpoint("characters")))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({ "name": "Aria", "is_dead": 0 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": 1,
                "entity_id": 100,
                "name": "Aria",
                "is_dead": false,
                "created_at": "2024-01-01T00:00:00.000000Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let aria = client
        .characters()
        .create(Fields::new().set("name", "Aria").set("is_dead", false))
        .await
        .unwrap();

    assert_eq!(aria.id(), Some(1));
    assert_eq!(aria.entity_id(), Some(100));
    assert_eq!(aria.get_bool("is_private"), Some(false));
}

#[tokio::test]
async fn test_list_reads_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(endpoint("locations")))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .and(query_param("is_private", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 4, "entity_id": 40, "name": "Harbor" }],
            "meta": { "current_page": 2, "last_page": 3, "per_page": 10, "total": 25 },
            "links": { "next": "http://example/locations?page=3" },
            "sync": "2024-06-01T12:00:00.000000Z"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = ListOptions::new().page(2).limit(10).filter("is_private", true);
    let locations = client.locations().list(&options).await.unwrap();

    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].name(), Some("Harbor"));
    assert!(client.locations().has_next_page());
    assert_eq!(client.locations().pagination().total, Some(25));
    assert_eq!(
        client.locations().sync_cursor().as_deref(),
        Some("2024-06-01T12:00:00.000000Z")
    );
}

#[tokio::test]
async fn test_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(endpoint("characters/999")))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not found." })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.characters().get(999, false).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(endpoint("notes/9")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.notes().delete(9).await.unwrap());
}

#[tokio::test]
async fn test_search_term_is_one_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(endpoint("search/red%20dragon")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 2, "entity_id": 20, "name": "Red Dragon" }],
            "meta": { "current_page": 1, "last_page": 1 }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let results = client.search("red dragon", 1).await.unwrap();

    assert_eq!(results[0].entity_id(), Some(20));
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limited_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(endpoint("characters/1")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint("characters/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 1, "entity_id": 100, "name": "Aria" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let aria = client.characters().get(1, false).await.unwrap();

    assert_eq!(aria.name(), Some("Aria"));
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_rate_limit_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(endpoint("characters/1")))
        .respond_with(ResponseTemplate::new(429).insert_header("X-RateLimit-Remaining", "0"))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap();
    let config = ClientConfig::new("test-token", 123)
        .with_api_url(api)
        .with_retry(RetryPolicy::disabled());
    let client = KankaClient::new(config, Arc::new(ReqwestTransport::new().unwrap()));

    let err = client.characters().get(1, false).await.unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)));
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn test_embedding_uploads_multipart_asset() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("map.png");
    std::fs::write(&map, b"map-bytes").unwrap();

    Mock::given(method("GET"))
        .and(path(endpoint("characters/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 1, "entity_id": 100, "name": "Aria", "entry": "<img src=\"map\">" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint("entities/100/entity_assets")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "meta": { "current_page": 1, "last_page": 1 }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(endpoint("entities/100/entity_assets")))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": 10,
                "entity_id": 100,
                "name": "map:0123456789ab",
                "type_id": 1,
                "_url": "https://th.kanka.io/w/map.png"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(endpoint("characters/1")))
        .and(body_json(json!({ "entry": "<img src=\"https://th.kanka.io/w/map.png\">" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 1,
                "entity_id": 100,
                "name": "Aria",
                "entry": "<img src=\"https://th.kanka.io/w/map.png\">"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The bare id is resolved to the universal id with a fetch.
    let client = client_for(&server);
    let (aria, outcome) = client
        .characters()
        .update_with_images(
            1,
            Fields::new().set("entry", "<img src=\"map\">"),
            &EmbeddedImages::new().with("map", &map),
            EmbedOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.uploaded.len(), 1);
    assert_eq!(
        aria.entry(),
        Some("<img src=\"https://th.kanka.io/w/map.png\">")
    );

    let received = server.received_requests().await.unwrap();
    let upload = received
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains("name=\"file\"; filename=\"map.png\""));
    assert!(body.contains("map-bytes"));
    assert!(body.contains("name=\"type_id\""));
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on a port freed by a dropped listener.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let api = ApiUrl::new(format!("http://127.0.0.1:{}", port)).unwrap();
    let config = ClientConfig::new("test-token", 123).with_api_url(api);
    let transport = ReqwestTransport::with_timeout(Duration::from_secs(2)).unwrap();
    let client = KankaClient::new(config, Arc::new(transport));

    let err = client.characters().get(1, false).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
