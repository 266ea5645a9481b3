//! Full pipeline: registry -> strategy -> normalizer -> cache -> aggregator

use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fairway::cache::{cache_key, CacheStore, MemoryCache};
use fairway::context::Services;
use fairway::dispatcher::Origin;
use fairway::models::{BookingSystem, Course, SlotFilter};
use fairway::registry::CourseRegistry;
use fairway::scraper::{FallbackPolicy, StrategySet};

use super::fixtures::{club_api_body, facility_api_body, RENDERED_SHEET};
use crate::common::{date, test_config, FakeRenderer};

async fn mock_booking_apis() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tee-times"))
        .and(query_param("facilityId", "1204"))
        .and(query_param("courseId", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(facility_api_body()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/clubs/river-bend/tee-times"))
        .respond_with(ResponseTemplate::new(200).set_body_json(club_api_body()))
        .mount(&server)
        .await;

    server
}

fn registry(server: &MockServer) -> CourseRegistry {
    let json = serde_json::json!([
        {
            "id": "pine-hills",
            "name": "Pine Hills Golf Club",
            "bookingSystem": "direct_api_a",
            "sourceLocator": format!("{}/facilities/1204/courses/3", server.uri()),
            "city": "Springfield"
        },
        {
            "id": "river-bend",
            "name": "River Bend Municipal",
            "bookingSystem": "direct_api_b",
            "sourceLocator": format!("{}/clubs/river-bend", server.uri()),
            "city": "Springfield"
        },
        {
            "id": "oak-meadow",
            "name": "Oak Meadow Links",
            "bookingSystem": "browser_rendered",
            "sourceLocator": "https://oak-meadow.example/tee-times?d={date}",
            "city": "Shelbyville"
        },
        {
            "id": "lakeside",
            "name": "Lakeside Par 3",
            "bookingSystem": "phone_only",
            "sourceLocator": "tel:+15555550142",
            "city": "Shelbyville"
        }
    ]);
    CourseRegistry::from_json(&json.to_string()).unwrap()
}

fn build(server: &MockServer, policy: FallbackPolicy) -> Services {
    let mut config = test_config();
    config.scraper.fallback_policy = policy;
    config.scraper.max_retries = 0;

    let renderer = FakeRenderer::new(RENDERED_SHEET);
    let strategies =
        StrategySet::from_config(&config.scraper, renderer.clone(), Duration::from_millis(10)).unwrap();

    Services::assemble(
        &config,
        registry(server),
        Arc::new(MemoryCache::new()),
        renderer,
        strategies,
    )
}

fn course<'a>(services: &'a Services, id: &str) -> &'a Course {
    services.registry.get(id).unwrap()
}

#[tokio::test]
async fn test_every_booking_system_normalizes() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Empty);

    let results = services.aggregator.batch(&services.registry.ids(), date()).await;
    assert_eq!(results.len(), 4);

    let pine = &results[0];
    assert_eq!(pine.course.id, "pine-hills");
    assert_eq!(pine.tee_times.len(), 2);
    assert_eq!(pine.tee_times[0].price, Some(45.0));
    assert!(!pine.tee_times[0].is_hot_deal);
    assert_eq!(pine.tee_times[1].available_slots, 2);
    assert!(pine.tee_times[1].is_hot_deal);

    let river = &results[1];
    assert_eq!(river.tee_times.len(), 2);
    assert_eq!(river.tee_times[0].available_slots, 3);
    assert_eq!(river.tee_times[1].price, None);
    assert_eq!(river.tee_times[1].holes, 9);

    let oak = &results[2];
    assert_eq!(oak.tee_times.len(), 2);
    assert_eq!(oak.tee_times[0].time, "6:40 AM");
    assert_eq!(oak.tee_times[0].price, Some(30.0));
    assert_eq!(oak.tee_times[1].time, "11:20 AM");
    assert_eq!(oak.tee_times[1].price, Some(25.0));
    assert!(oak.tee_times[1].is_hot_deal);

    let lakeside = &results[3];
    assert_eq!(lakeside.course.booking_system, BookingSystem::Unknown);
    assert!(lakeside.tee_times.is_empty());
}

#[tokio::test]
async fn test_results_are_cached_per_system_course_and_date() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Empty);
    let pine = course(&services, "pine-hills").clone();

    let first = services.dispatcher.lookup(&pine, date()).await;
    assert_eq!(first.origin, Origin::Upstream);

    let key = cache_key(BookingSystem::DirectApiA, "pine-hills", date());
    let entry = services.cache.get(&key).await.unwrap().unwrap();
    assert_eq!(entry.value, first.slots);

    let second = services.dispatcher.lookup(&pine, date()).await;
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(second.slots, first.slots);

    // Another date is a separate entry
    let next_day = date().succ_opt().unwrap();
    let other = services.dispatcher.lookup(&pine, next_day).await;
    assert_eq!(other.origin, Origin::Upstream);

    let requests = server.received_requests().await.unwrap();
    let facility_calls = requests
        .iter()
        .filter(|r| r.url.path() == "/api/tee-times")
        .count();
    assert_eq!(facility_calls, 2);
}

#[tokio::test]
async fn test_search_applies_filter_across_systems() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Empty);

    let filter = SlotFilter {
        max_price: Some(40.0),
        min_slots: 3,
    };
    let results = services
        .aggregator
        .search(&services.registry.ids(), date(), filter)
        .await;

    let summary: Vec<(&str, Vec<&str>)> = results
        .iter()
        .map(|r| {
            (
                r.course.id.as_str(),
                r.tee_times.iter().map(|t| t.time.as_str()).collect(),
            )
        })
        .collect();

    // pine-hills: 7:00 is $45, 7:10 has 2 spots; river-bend: 8:20 is unpriced
    assert_eq!(
        summary,
        vec![
            ("river-bend", vec!["8:20 AM"]),
            ("oak-meadow", vec!["6:40 AM", "11:20 AM"]),
        ]
    );
}

#[tokio::test]
async fn test_sample_fallback_policy() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Sample);

    let lakeside = course(&services, "lakeside").clone();
    let slots = services.dispatcher.resolve(&lakeside, date()).await;

    assert_eq!(slots.len(), 3);
    assert!(slots.iter().any(|s| s.is_hot_deal));
    assert!(slots.iter().any(|s| s.holes == 9));
}

#[tokio::test]
async fn test_warmup_populates_cache_for_two_days() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Empty);

    let report = services.scheduler.run_for(date()).await;
    assert_eq!(report.dates, vec![date(), date().succ_opt().unwrap()]);
    assert_eq!(report.courses, 4);
    assert_eq!(report.resolutions, 8);
    assert_eq!(report.failed, 0);

    for course in services.registry.all() {
        for day in &report.dates {
            let key = cache_key(course.booking_system, &course.id, *day);
            assert!(
                services.cache.get(&key).await.unwrap().is_some(),
                "missing warm entry for {key}"
            );
        }
    }

    let pine = course(&services, "pine-hills").clone();
    assert_eq!(
        services.dispatcher.lookup(&pine, date()).await.origin,
        Origin::Cache
    );
}

#[tokio::test]
async fn test_refresh_replaces_cached_sheet() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Empty);
    let river = course(&services, "river-bend").clone();

    services.dispatcher.resolve(&river, date()).await;
    let refreshed = services.dispatcher.refresh(&river, date()).await;
    assert_eq!(refreshed.origin, Origin::Upstream);
    assert_eq!(refreshed.slots.len(), 2);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_shutdown_closes_renderer() {
    let server = mock_booking_apis().await;
    let services = build(&server, FallbackPolicy::Empty);

    assert!(services.renderer.health_check().await);
    services.shutdown().await;
    assert!(!services.renderer.health_check().await);
}
