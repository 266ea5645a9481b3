//! Common test utilities
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fairway::cache::{CacheStore, MemoryCache};
use fairway::config::Config;
use fairway::context::Services;
use fairway::models::{BookingSystem, Course};
use fairway::registry::CourseRegistry;
use fairway::renderer::{PageRenderer, RenderedPage};
use fairway::scraper::{FallbackPolicy, FallbackStrategy, RawPayload, ScrapeStrategy, StrategySet};
use fairway::server::{build_router, AppState};
use fairway::utils::error::{FetchError, RenderError, ScrapeError};

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub fn course(id: &str, system: BookingSystem, city: &str) -> Course {
    Course {
        id: id.to_string(),
        name: format!("{id} golf club"),
        booking_system: system,
        source_locator: format!("https://{id}.example.com/facilities/10/courses/2"),
        city: city.to_string(),
    }
}

/// Two-course registry used by most scenarios
pub fn registry() -> CourseRegistry {
    CourseRegistry::new(vec![
        course("pine-hills", BookingSystem::DirectApiA, "Springfield"),
        course("oak-meadow", BookingSystem::DirectApiB, "Shelbyville"),
    ])
    .unwrap()
}

/// The sheet returned by upstream for "pine-hills" in the search example
pub fn pine_hills_records() -> Vec<Value> {
    vec![
        json!({"time": "7:00 AM", "price": 45, "availableSlots": 4}),
        json!({"time": "9:30 AM", "price": 39, "availableSlots": 2}),
        json!({"time": "1:00 PM", "price": 60, "availableSlots": 4}),
    ]
}

// ============================================================================
// Scripted strategies
// ============================================================================

pub enum Behavior {
    Records(Vec<Value>),
    Fail,
    Hang,
}

/// Strategy whose output is fixed up front; counts invocations
pub struct Scripted {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl Scripted {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn records(records: Vec<Value>) -> Arc<Self> {
        Self::new(Behavior::Records(records))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScrapeStrategy for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_raw(&self, _: &Course, _: NaiveDate) -> Result<RawPayload, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Records(records) if records.is_empty() => Ok(RawPayload::Empty),
            Behavior::Records(records) => Ok(RawPayload::Json(records.clone())),
            Behavior::Fail => Err(FetchError::ServerError(503).into()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(RawPayload::Empty)
            }
        }
    }
}

pub fn strategies(
    direct_a: Arc<dyn ScrapeStrategy>,
    direct_b: Arc<dyn ScrapeStrategy>,
) -> StrategySet {
    let fallback: Arc<dyn ScrapeStrategy> = Arc::new(FallbackStrategy::new(FallbackPolicy::Empty));
    StrategySet {
        browser: Arc::clone(&fallback),
        direct_a,
        direct_b,
        fallback,
    }
}

// ============================================================================
// Fake renderer
// ============================================================================

/// Renderer that returns canned HTML without launching a browser
pub struct FakeRenderer {
    html: String,
    healthy: AtomicBool,
}

impl FakeRenderer {
    pub fn new(html: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            html: html.into(),
            healthy: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str, _settle: Duration) -> Result<RenderedPage, RenderError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }
        Ok(RenderedPage {
            url: url.to_string(),
            html: self.html.clone(),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Service graph
// ============================================================================

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.scraper.course_timeout_secs = 1;
    config
}

pub fn services(registry: CourseRegistry, strategies: StrategySet) -> Arc<Services> {
    services_with_cache(registry, strategies, Arc::new(MemoryCache::new()))
}

pub fn services_with_cache(
    registry: CourseRegistry,
    strategies: StrategySet,
    cache: Arc<dyn CacheStore>,
) -> Arc<Services> {
    Arc::new(Services::assemble(
        &test_config(),
        registry,
        cache,
        FakeRenderer::new("<html></html>"),
        strategies,
    ))
}

pub fn app(services: Arc<Services>) -> Router {
    build_router(AppState::new(services), &test_config().server)
}
