//! Connector tests against a fake upstream
//!
//! The review provider and the place-details API are both served by wiremock.

use frd_common::config::{HostawayConfig, PlacesConfig};
use frd_ingest::raw::{HostawayReview, RawReview};
use frd_ingest::services::{
    CredentialManager, HostawayClient, ListingsConnector, MemoryTokenStore, PlacesConnector,
    ReviewsConnector, UpstreamError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hostaway_config(server: &MockServer) -> HostawayConfig {
    HostawayConfig {
        base_url: server.uri(),
        client_id: "61148".to_string(),
        client_secret: "test-secret".to_string(),
        ..Default::default()
    }
}

fn credentials(server: &MockServer) -> Arc<CredentialManager> {
    Arc::new(CredentialManager::new(
        &hostaway_config(server),
        reqwest::Client::new(),
        Arc::new(MemoryTokenStore::new()),
    ))
}

fn client(server: &MockServer) -> HostawayClient {
    HostawayClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/accessTokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": "test-token"
        })))
        .mount(server)
        .await;
}

fn seed() -> Vec<HostawayReview> {
    vec![
        HostawayReview {
            id: 7453,
            guest_name: Some("Seed Guest".to_string()),
            ..Default::default()
        },
        HostawayReview {
            id: 7454,
            guest_name: Some("Seed Guest".to_string()),
            ..Default::default()
        },
    ]
}

#[tokio::test]
async fn test_concurrent_token_requests_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accessTokens"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=61148"))
        .and(body_string_contains("scope=general"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "token_type": "Bearer",
                    "expires_in": 3600,
                    "access_token": "shared-token"
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = credentials(&server);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move { manager.get_token().await }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared-token");
    }
    server.verify().await;
}

#[tokio::test]
async fn test_rejected_exchange_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accessTokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let err = credentials(&server).get_token().await.unwrap_err();
    match err {
        UpstreamError::Authentication(msg) => assert!(msg.contains("401")),
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reviews_fall_through_404_to_next_endpoint() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/reviews"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings/reviews"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": [
                {"id": 1, "type": "guest-to-host", "status": "published", "rating": 4.0},
                {"id": 7454, "guestName": "Upstream Guest"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = ReviewsConnector::new(client(&server), credentials(&server), seed());
    let raws = connector.fetch().await;

    let ids: Vec<i64> = raws.iter().filter_map(RawReview::native_id).collect();
    assert_eq!(ids, vec![1, 7454, 7453]);
    match &raws[1] {
        RawReview::Hostaway(r) => assert_eq!(r.guest_name.as_deref(), Some("Upstream Guest")),
        other => panic!("expected upstream record, got {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_first_non_empty_endpoint_short_circuits() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": [{"id": 2}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings/reviews"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let connector = ReviewsConnector::new(client(&server), credentials(&server), Vec::new());
    assert_eq!(connector.fetch().await.len(), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_reviews_fall_back_to_seed_when_auth_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accessTokens"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let connector = ReviewsConnector::new(client(&server), credentials(&server), seed());
    let raws = connector.fetch().await;
    assert_eq!(raws.len(), 2);
    assert!(raws.iter().all(|r| matches!(r, RawReview::Seed(_))));
}

#[tokio::test]
async fn test_reviews_fall_back_to_seed_on_malformed_body() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let connector = ReviewsConnector::new(client(&server), credentials(&server), seed());
    assert_eq!(connector.fetch().await.len(), 2);
}

#[tokio::test]
async fn test_listings_fetch_and_fetch_by_id() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/listings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": [
                {"id": 155, "internalListingName": "2B E1 - 33 St Clements"},
                {"id": "broken"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings/156"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": {"id": 156, "name": "The Putney Apart"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let connector = ListingsConnector::new(client(&server), credentials(&server));

    let listings = connector.fetch().await;
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].id, 155);

    let by_id = connector.fetch_by_id(156).await.unwrap();
    assert_eq!(by_id.name.as_deref(), Some("The Putney Apart"));
    assert!(connector.fetch_by_id(999).await.is_none());
}

#[tokio::test]
async fn test_listings_empty_when_upstream_down() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/listings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let connector = ListingsConnector::new(client(&server), credentials(&server));
    assert!(connector.fetch().await.is_empty());
}

fn places_config(server: &MockServer) -> PlacesConfig {
    PlacesConfig {
        base_url: server.uri(),
        api_key: Some("places-key".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_place_reviews_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "ChIJ_putney"))
        .and(query_param("key", "places-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "name": "The Putney Apart",
                "reviews": [
                    {"author_name": "Ana", "rating": 5, "text": "Great", "time": 1700000000},
                    {"author_name": "Ben", "rating": 4, "text": "Good", "time": 1700000500}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = PlacesConnector::new(&places_config(&server), Duration::from_secs(2)).unwrap();
    assert_eq!(connector.fetch("ChIJ_putney").await.len(), 2);
    assert_eq!(connector.fetch("ChIJ_putney").await.len(), 2);
    server.verify().await;
}

#[tokio::test]
async fn test_place_api_errors_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "quota"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let connector = PlacesConnector::new(&places_config(&server), Duration::from_secs(2)).unwrap();
    assert!(connector.fetch("ChIJ_putney").await.is_empty());
    assert!(connector.fetch("ChIJ_putney").await.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_find_place_id_takes_first_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/findplacefromtext/json"))
        .and(query_param("inputtype", "textquery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "candidates": [{"place_id": "first"}, {"place_id": "second"}]
        })))
        .mount(&server)
        .await;

    let connector = PlacesConnector::new(&places_config(&server), Duration::from_secs(2)).unwrap();
    assert_eq!(
        connector.find_place_id("Putney Bridge Rd, London").await.as_deref(),
        Some("first")
    );
}

/// First exchange hands out `old-token`, every later one `new-token`
async fn mount_rotating_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/accessTokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": "old-token"
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accessTokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": "new-token"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rejected_token_is_renewed_before_retry() {
    let server = MockServer::start().await;
    mount_rotating_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/reviews"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token revoked"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reviews"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": [{"id": 3}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings/reviews"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let manager = credentials(&server);
    let connector = ReviewsConnector::new(client(&server), Arc::clone(&manager), Vec::new());
    let ids: Vec<i64> = connector
        .fetch()
        .await
        .iter()
        .filter_map(RawReview::native_id)
        .collect();
    assert_eq!(ids, vec![3]);

    // The renewed token is the cached one now
    assert_eq!(manager.get_token().await.unwrap(), "new-token");
    server.verify().await;
}

#[tokio::test]
async fn test_listings_renew_rejected_token() {
    let server = MockServer::start().await;
    mount_rotating_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/listings"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": [{"id": 155, "name": "The Putney Apart"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = ListingsConnector::new(client(&server), credentials(&server));
    let listings = connector.fetch().await;
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].id, 155);
    server.verify().await;
}

#[tokio::test]
async fn test_renew_is_shared_by_callers_holding_the_same_token() {
    let server = MockServer::start().await;
    mount_rotating_token(&server).await;

    let manager = credentials(&server);
    let rejected = manager.get_token().await.unwrap();
    assert_eq!(rejected, "old-token");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let manager = Arc::clone(&manager);
        let rejected = rejected.clone();
        handles.push(tokio::spawn(async move { manager.renew(&rejected).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "new-token");
    }
    server.verify().await;
}
