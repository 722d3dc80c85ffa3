//! Integration tests for spinclient

use spinclient::{Error, SpinClient, SpinSource};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create a mock spins envelope with a single latest spin
fn mock_spins_json(id: u64, artist: &str, song: &str) -> serde_json::Value {
    json!({
        "items": [
            {
                "id": id,
                "artist": artist,
                "song": song,
                "release": "Some Album",
                "start": "2024-03-01T15:04:05Z",
                "duration": 245,
                "playlist_id": 9913
            }
        ]
    })
}

async fn client_for(proxy: &MockServer, primary: &MockServer) -> SpinClient {
    SpinClient::builder()
        .proxy_base(proxy.uri())
        .primary_base(primary.uri())
        .primary_api_key("test-key")
        .build()
        .unwrap()
}

#[tokio::test]
async fn fetch_uses_proxy_when_healthy() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/spins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_spins_json(100, "Stereolab", "French Disko")))
        .mount(&proxy)
        .await;

    let client = client_for(&proxy, &primary).await;
    let fetched = client.fetch_latest_spin().await.unwrap();

    assert_eq!(fetched.source, SpinSource::Proxy);
    assert_eq!(fetched.spin.id, 100);
    assert_eq!(fetched.spin.artist, "Stereolab");
    // No request should have reached the primary API
    assert!(primary.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_falls_back_to_primary_on_proxy_503() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/spins"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&proxy)
        .await;

    Mock::given(method("GET"))
        .and(path("/spins"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_spins_json(101, "Broadcast", "Come On Let's Go")))
        .mount(&primary)
        .await;

    let client = client_for(&proxy, &primary).await;
    let fetched = client.fetch_latest_spin().await.unwrap();

    assert_eq!(fetched.source, SpinSource::Primary);
    assert_eq!(fetched.spin.id, 101);
}

#[tokio::test]
async fn fetch_falls_back_on_malformed_proxy_payload() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/spins"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&proxy)
        .await;

    Mock::given(method("GET"))
        .and(path("/spins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_spins_json(102, "Pram", "Loredo Venus")))
        .mount(&primary)
        .await;

    let client = client_for(&proxy, &primary).await;
    let fetched = client.fetch_latest_spin().await.unwrap();

    assert_eq!(fetched.source, SpinSource::Primary);
    assert_eq!(fetched.spin.id, 102);
}

#[tokio::test]
async fn fetch_fails_when_both_sources_fail() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/spins"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&proxy)
        .await;

    Mock::given(method("GET"))
        .and(path("/spins"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&primary)
        .await;

    let client = client_for(&proxy, &primary).await;
    let err = client.fetch_latest_spin().await.unwrap_err();

    // The surfaced error is the primary's, the last source tried
    assert!(matches!(err, Error::Api(status) if status.as_u16() == 500));
}

#[tokio::test]
async fn empty_feed_is_a_fetch_failure() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/spins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&proxy)
        .await;

    Mock::given(method("GET"))
        .and(path("/spins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&primary)
        .await;

    let client = client_for(&proxy, &primary).await;
    let err = client.fetch_latest_spin().await.unwrap_err();
    assert!(matches!(err, Error::EmptyFeed));
}

#[tokio::test]
async fn sse_probe_succeeds_on_reachable_endpoint() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spin-events"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/event-stream"),
        )
        .mount(&proxy)
        .await;

    let client = client_for(&proxy, &primary).await;
    client.probe_sse_endpoint().await.unwrap();
}

#[tokio::test]
async fn sse_probe_fails_on_error_status() {
    let proxy = MockServer::start().await;
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spin-events"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&proxy)
        .await;

    let client = client_for(&proxy, &primary).await;
    let err = client.probe_sse_endpoint().await.unwrap_err();
    assert!(matches!(err, Error::Api(status) if status.as_u16() == 404));
}
