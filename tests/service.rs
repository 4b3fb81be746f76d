mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Duration as ChronoDuration;
use common::*;
use matchday_feed::time::to_iso;
use matchday_feed::{Aggregator, Clock, MatchService, ResultCache};
use tokio_test::assert_ok;

fn service(base_url: &str, clock: Arc<ManualClock>) -> MatchService {
    let config = config(base_url);
    let aggregator = assert_ok!(Aggregator::from_config(&config));
    let cache = ResultCache::new(config.cache_ttl, clock.clone());
    MatchService::new(aggregator, cache, clock, Duration::from_secs(10))
}

async fn mock_upstream(
    server: &mut mockito::ServerGuard,
    hits: usize,
) -> (mockito::Mock, mockito::Mock) {
    let catalog = server
        .mock("GET", CATALOG_PATH)
        .with_status(200)
        .with_body(catalog_body(&["Week_38"]))
        .expect(hits)
        .create_async()
        .await;
    let collection = server
        .mock("GET", collection_path("Week_38").as_str())
        .with_status(200)
        .with_body(collection_body(&[
            fixture("21-09-2024", "14:00", "Pinoké Heren 01", "Kampong Heren 01", HOME),
            fixture("22-09-2024", "10:00", "Pinoké Dames 03", "Hurley Dames 03", HOME),
        ]))
        .expect(hits)
        .create_async()
        .await;
    (catalog, collection)
}

#[tokio::test]
async fn success_envelope_shape() {
    let mut server = mockito::Server::new_async().await;
    mock_upstream(&mut server, 1).await;
    let clock = Arc::new(ManualClock::new(saturday_noon()));
    let service = service(&server.url(), clock.clone());

    let (status, body) = service.respond().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isToday"], true);
    assert_eq!(body["serverTime"], to_iso(&clock.now()));
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["date"], "21-09-2024");
    assert_eq!(matches[0]["time"], "14:00");
    assert_eq!(matches[0]["location"]["name"], HOME);
    assert_eq!(matches[0]["utcDate"], "2024-09-21T12:00:00.000Z");
    assert_eq!(matches[0]["isOnViaplay"], false);
}

#[tokio::test]
async fn cache_serves_within_ttl_and_refreshes_after() {
    let mut server = mockito::Server::new_async().await;
    let (catalog, collection) = mock_upstream(&mut server, 2).await;
    let clock = Arc::new(ManualClock::new(saturday_noon()));
    let service = service(&server.url(), clock.clone());

    let (_, first) = service.respond().await;

    clock.advance(ChronoDuration::minutes(30) - ChronoDuration::milliseconds(1));
    let (status, second) = service.respond().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["matches"], first["matches"]);
    assert_eq!(second["isToday"], first["isToday"]);
    assert_eq!(second["serverTime"], to_iso(&clock.now()));
    assert_ne!(second["serverTime"], first["serverTime"]);

    clock.advance(ChronoDuration::milliseconds(2));
    let (status, _) = service.respond().await;
    assert_eq!(status, StatusCode::OK);

    catalog.assert_async().await;
    collection.assert_async().await;
}

#[tokio::test]
async fn catalog_failure_returns_error_envelope_and_keeps_cache() {
    let mut server = mockito::Server::new_async().await;
    let (catalog, _) = mock_upstream(&mut server, 1).await;
    let clock = Arc::new(ManualClock::new(saturday_noon()));
    let service = service(&server.url(), clock.clone());

    let (status, _) = service.respond().await;
    assert_eq!(status, StatusCode::OK);
    catalog.assert_async().await;
    catalog.remove_async().await;
    let cached = service.cache().last_entry().await.unwrap();

    server
        .mock("GET", CATALOG_PATH)
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;
    clock.advance(ChronoDuration::hours(1));

    let (status, body) = service.respond().await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], true);
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["statusMessage"], "Server Error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Collections fetch failed: 502"));

    let after = service.cache().last_entry().await.unwrap();
    assert_eq!(after.computed_at, cached.computed_at);
    assert_eq!(after.payload, cached.payload);
    assert_eq!(*service.health().error_count.read().await, 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let mut server = mockito::Server::new_async().await;
    let (catalog, collection) = mock_upstream(&mut server, 1).await;
    let clock = Arc::new(ManualClock::new(saturday_noon()));
    let service = Arc::new(service(&server.url(), clock));

    let calls: Vec<_> = (0..5)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.respond().await })
        })
        .collect();
    for call in calls {
        let (status, body) = call.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isToday"], true);
    }

    catalog.assert_async().await;
    collection.assert_async().await;
}
