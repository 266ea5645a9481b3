//! Failure modes: every one degrades to an empty sheet, never an error

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use fairway::cache::{CacheEntry, CacheStore};
use fairway::dispatcher::Origin;
use fairway::models::{BookingSystem, Course, TeeTimeSlot};
use fairway::registry::CourseRegistry;
use fairway::scraper::{DirectApiClient, DirectApiStrategy, DirectApiVariant, ScrapeStrategy};
use fairway::utils::error::CacheError;

use crate::common::{
    course, date, pine_hills_records, registry, services, services_with_cache, strategies,
    Behavior, Scripted,
};

/// Cache backend that is down for every command
struct DownCache;

#[async_trait]
impl CacheStore for DownCache {
    async fn get(&self, _: &str) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _: &str, _: &[TeeTimeSlot], _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "down"
    }
}

#[tokio::test]
async fn test_hung_course_times_out_alone() {
    let pine = Scripted::records(pine_hills_records());
    let oak = Scripted::new(Behavior::Hang);
    let services = services(registry(), strategies(pine, oak));

    let started = Instant::now();
    let results = services
        .aggregator
        .batch(&["oak-meadow".to_string(), "pine-hills".to_string()], date())
        .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(results.len(), 2);
    assert!(results[0].tee_times.is_empty());
    assert_eq!(results[1].tee_times.len(), 3);
}

#[tokio::test]
async fn test_single_lookup_on_hung_course_is_bounded() {
    let pine = Scripted::new(Behavior::Hang);
    let oak = Scripted::records(vec![]);
    let services = services(registry(), strategies(pine, oak));
    let pine_course = services.registry.get("pine-hills").unwrap().clone();

    let started = Instant::now();
    let resolution = services.dispatcher.lookup(&pine_course, date()).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(resolution.origin, Origin::Degraded);
}

#[tokio::test]
async fn test_failed_upstream_is_degraded_and_uncached() {
    let pine = Scripted::new(Behavior::Fail);
    let oak = Scripted::records(vec![]);
    let services = services(registry(), strategies(pine.clone(), oak.clone()));

    let pine_course = services.registry.get("pine-hills").unwrap().clone();
    let first = services.dispatcher.lookup(&pine_course, date()).await;
    assert_eq!(first.origin, Origin::Degraded);
    assert!(first.slots.is_empty());

    services.dispatcher.lookup(&pine_course, date()).await;
    assert_eq!(pine.calls(), 2);

    // A genuinely empty sheet is cached
    let oak_course = services.registry.get("oak-meadow").unwrap().clone();
    services.dispatcher.lookup(&oak_course, date()).await;
    let second = services.dispatcher.lookup(&oak_course, date()).await;
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(oak.calls(), 1);
}

#[tokio::test]
async fn test_cache_outage_falls_through_to_upstream() {
    let pine = Scripted::records(pine_hills_records());
    let oak = Scripted::records(vec![]);
    let services = services_with_cache(registry(), strategies(pine.clone(), oak), Arc::new(DownCache));

    let pine_course = services.registry.get("pine-hills").unwrap().clone();
    let first = services.dispatcher.lookup(&pine_course, date()).await;
    assert_eq!(first.origin, Origin::Upstream);
    assert_eq!(first.slots.len(), 3);

    let refreshed = services.dispatcher.refresh(&pine_course, date()).await;
    assert_eq!(refreshed.slots.len(), 3);
    assert_eq!(pine.calls(), 2);
}

#[tokio::test]
async fn test_upstream_rate_limited_then_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"time": "10:00 AM", "price": 20}
        ])))
        .mount(&server)
        .await;

    let client = Arc::new(
        DirectApiClient::with_config(100, 1, Duration::from_secs(2))
            .unwrap()
            .with_backoff(Duration::from_millis(10)),
    );
    let direct_a: Arc<dyn ScrapeStrategy> =
        Arc::new(DirectApiStrategy::new(DirectApiVariant::Facility, client));

    let mut pine = course("pine-hills", BookingSystem::DirectApiA, "Springfield");
    pine.source_locator = format!("{}/facilities/10/courses/2", server.uri());
    let registry = CourseRegistry::new(vec![pine.clone()]).unwrap();

    let services = services(registry, strategies(direct_a, Scripted::records(vec![])));
    let slots = services.dispatcher.resolve(&pine, date()).await;

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].price, Some(20.0));
}

#[tokio::test]
async fn test_bad_locator_degrades() {
    let server = MockServer::start().await;
    let client = Arc::new(DirectApiClient::new(100).unwrap().with_base_url(&server.uri()));
    let direct_b: Arc<dyn ScrapeStrategy> =
        Arc::new(DirectApiStrategy::new(DirectApiVariant::ClubSlug, client));

    let broken = Course {
        source_locator: "not a url".into(),
        ..course("river-bend", BookingSystem::DirectApiB, "Springfield")
    };
    let registry = CourseRegistry::new(vec![broken.clone()]).unwrap();
    let services = services(registry, strategies(Scripted::records(vec![]), direct_b));

    let resolution = services.dispatcher.lookup(&broken, date()).await;
    assert_eq!(resolution.origin, Origin::Degraded);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_permits_released_after_failures() {
    let pine = Scripted::new(Behavior::Fail);
    let oak = Scripted::new(Behavior::Fail);
    let services = services(registry(), strategies(pine, oak));
    let before = services.dispatcher.available_fetch_permits();

    let results = services
        .aggregator
        .batch(&services.registry.ids(), date())
        .await;

    assert!(results.iter().all(|r| r.tee_times.is_empty()));
    assert_eq!(services.dispatcher.available_fetch_permits(), before);
}

#[tokio::test]
async fn test_timed_out_course_releases_permit() {
    let pine = Scripted::new(Behavior::Hang);
    let oak = Scripted::records(vec![]);
    let services = services(registry(), strategies(pine, oak));
    let before = services.dispatcher.available_fetch_permits();

    services
        .aggregator
        .batch(&["pine-hills".to_string()], date())
        .await;

    // The timed-out task is dropped with its permit
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(services.dispatcher.available_fetch_permits(), before);
}
