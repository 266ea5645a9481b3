//! Per-booking-system scraping strategies
//!
//! Each booking system exposes availability differently. A [`ScrapeStrategy`]
//! hides that behind two steps:
//!
//! 1. `fetch_raw` - talk to the upstream and return a [`RawPayload`], or a
//!    typed [`ScrapeError`]. Nothing panics past this boundary.
//! 2. `parse` - hand the payload to the normalizer. Infallible.
//!
//! [`StrategySet`] owns one instance of every variant and selects by
//! [`BookingSystem`] with an exhaustive match, so adding a booking system
//! is a compile error until it is routed.

pub mod browser;
pub mod direct;
pub mod fallback;

pub use browser::BrowserRenderedStrategy;
pub use direct::{DirectApiClient, DirectApiStrategy, DirectApiVariant};
pub use fallback::{FallbackPolicy, FallbackStrategy};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{BookingSystem, Course, TeeTimeSlot};
use crate::normalizer::{self, RawNode};
use crate::renderer::PageRenderer;
use crate::utils::error::{FetchError, ScrapeError};

/// Upstream data owned by a single strategy invocation
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Slot-like nodes matched on a rendered page
    Dom(Vec<RawNode>),
    /// Records from a JSON API body
    Json(Vec<Value>),
    /// Nothing to normalize
    Empty,
}

impl RawPayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Dom(nodes) => nodes.len(),
            Self::Json(records) => records.len(),
            Self::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability implemented once per booking system
#[async_trait]
pub trait ScrapeStrategy: Send + Sync {
    /// Short name for logs and metrics
    fn name(&self) -> &'static str;

    /// Fetch upstream data for a course on a date
    async fn fetch_raw(&self, course: &Course, date: NaiveDate) -> Result<RawPayload, ScrapeError>;

    /// Turn a payload into canonical slots. Never fails.
    fn parse(&self, payload: RawPayload) -> Vec<TeeTimeSlot> {
        match payload {
            RawPayload::Dom(nodes) => normalizer::normalize_nodes(&nodes),
            RawPayload::Json(records) => normalizer::normalize_records(&records),
            RawPayload::Empty => Vec::new(),
        }
    }

    /// `fetch_raw` followed by `parse`
    async fn scrape(&self, course: &Course, date: NaiveDate) -> Result<Vec<TeeTimeSlot>, ScrapeError> {
        let payload = self.fetch_raw(course, date).await?;
        Ok(self.parse(payload))
    }
}

/// Settings shared by the upstream-facing strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Direct API request timeout
    pub api_timeout_secs: u64,

    /// Global cap on simultaneous upstream fetches
    pub max_concurrent_fetches: usize,

    /// Direct API requests per second
    pub rate_limit: u32,

    /// Retries on 429/5xx
    pub max_retries: u32,
    /// Budget for one upstream scrape, counted from when it gets a fetch permit
    /// Budget for one course inside a fan-out
    pub course_timeout_secs: u64,

    /// Behaviour for unsupported booking systems
    pub fallback_policy: FallbackPolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: 10,
            max_concurrent_fetches: 5,
            rate_limit: 5,
            max_retries: 2,
            course_timeout_secs: 45,
            fallback_policy: FallbackPolicy::Empty,
        }
    }
}

impl ScraperConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn course_timeout(&self) -> Duration {
        Duration::from_secs(self.course_timeout_secs)
    }
}

/// One strategy per booking system
#[derive(Clone)]
pub struct StrategySet {
    pub browser: Arc<dyn ScrapeStrategy>,
    pub direct_a: Arc<dyn ScrapeStrategy>,
    pub direct_b: Arc<dyn ScrapeStrategy>,
    pub fallback: Arc<dyn ScrapeStrategy>,
}

impl StrategySet {
    /// Build the production strategies around a shared renderer
    pub fn from_config(
        config: &ScraperConfig,
        renderer: Arc<dyn PageRenderer>,
        settle: Duration,
    ) -> Result<Self, FetchError> {
        let client = Arc::new(DirectApiClient::with_config(
            config.rate_limit,
            config.max_retries,
            config.api_timeout(),
        )?);

        Ok(Self {
            browser: Arc::new(BrowserRenderedStrategy::new(renderer, settle)),
            direct_a: Arc::new(DirectApiStrategy::new(
                DirectApiVariant::Facility,
                Arc::clone(&client),
            )),
            direct_b: Arc::new(DirectApiStrategy::new(DirectApiVariant::ClubSlug, client)),
            fallback: Arc::new(FallbackStrategy::new(config.fallback_policy)),
        })
    }

    /// Strategy for a booking system; unknown systems get the fallback
    pub fn for_system(&self, system: BookingSystem) -> &Arc<dyn ScrapeStrategy> {
        match system {
            BookingSystem::BrowserRendered => &self.browser,
            BookingSystem::DirectApiA => &self.direct_a,
            BookingSystem::DirectApiB => &self.direct_b,
            BookingSystem::Unknown => &self.fallback,
        }
    }
}
