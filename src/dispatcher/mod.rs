//! Cache-aside resolution of a course's tee times
//!
//! `resolve` checks the cache and only scrapes on a miss. `refresh`
//! invalidates and scrapes unconditionally. Upstream failures never reach
//! the caller: they are logged, counted and resolved to an empty sheet that
//! is *not* cached, so the next call tries upstream again.
//!
//! A cache that errors is treated as absent. Reads degrade to a miss and
//! writes are skipped, so requests fall through to a direct fetch.
//!
//! The per-course fetch budget starts once a fetch permit is held. Time spent
//! queued behind other fetches does not count against it.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::cache::{cache_key, CacheStore};
use crate::error::FairwayErrorTrait;
use crate::metrics::{self, CacheLookup};
use crate::models::{Course, TeeTimeSlot};
use crate::scraper::StrategySet;
use crate::utils::error::ScrapeError;

/// Where a resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Live cache entry
    Cache,
    /// Fresh upstream scrape, now cached
    Upstream,
    /// Upstream failed; empty and uncached
    Degraded,
}

/// Slots plus provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub slots: Vec<TeeTimeSlot>,
    pub origin: Origin,
}

impl Resolution {
    fn degraded() -> Self {
        Self {
            slots: Vec::new(),
            origin: Origin::Degraded,
        }
    }
}

/// Default budget for one upstream scrape
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(45);

/// Routes courses to strategies behind the cache
pub struct Dispatcher {
    cache: Arc<dyn CacheStore>,
    strategies: StrategySet,
    ttl: Duration,
    /// Global cap on simultaneous upstream scrapes
    fetch_permits: Arc<Semaphore>,
    max_concurrent_fetches: usize,
    fetch_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        strategies: StrategySet,
        ttl: Duration,
        max_concurrent_fetches: usize,
    ) -> Self {
        let max_concurrent_fetches = max_concurrent_fetches.max(1);
        Self {
            cache,
            strategies,
            ttl,
            fetch_permits: Arc::new(Semaphore::new(max_concurrent_fetches)),
            max_concurrent_fetches,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set the budget for a single scrape, measured from permit acquisition
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Cached or freshly scraped tee times. Never fails.
    pub async fn resolve(&self, course: &Course, date: NaiveDate) -> Vec<TeeTimeSlot> {
        self.lookup(course, date).await.slots
    }

    /// Like `resolve`, reporting where the slots came from
    pub async fn lookup(&self, course: &Course, date: NaiveDate) -> Resolution {
        let key = cache_key(course.booking_system, &course.id, date);

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                metrics::record_cache_lookup(CacheLookup::Hit);
                tracing::debug!(key = %key, remaining_secs = entry.remaining_secs(), "Cache hit");
                return Resolution {
                    slots: entry.value,
                    origin: Origin::Cache,
                };
            }
            Ok(None) => {
                metrics::record_cache_lookup(CacheLookup::Miss);
                tracing::debug!(key = %key, "Cache miss");
            }
            Err(e) => {
                metrics::record_cache_lookup(CacheLookup::Error);
                tracing::warn!(key = %key, error = %e, "Cache read failed, fetching directly");
            }
        }

        self.fetch_and_store(&key, course, date).await
    }

    /// Drop any cached entry and scrape again
    pub async fn refresh(&self, course: &Course, date: NaiveDate) -> Resolution {
        let key = cache_key(course.booking_system, &course.id, date);

        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
        }
        tracing::info!(course_id = %course.id, date = %date, "Refreshing tee times");

        self.fetch_and_store(&key, course, date).await
    }

    async fn fetch_and_store(&self, key: &str, course: &Course, date: NaiveDate) -> Resolution {
        let slots = match self.scrape(course, date).await {
            Ok(slots) => slots,
            Err(e) => {
                if e.is_recoverable() {
                    tracing::warn!(
                        course_id = %course.id,
                        booking_system = %course.booking_system,
                        date = %date,
                        category = e.category().as_str(),
                        error = %e,
                        "Upstream fetch failed, returning no tee times"
                    );
                } else {
                    tracing::error!(
                        course_id = %course.id,
                        booking_system = %course.booking_system,
                        date = %date,
                        category = e.category().as_str(),
                        error = %e,
                        "Upstream fetch failed permanently, returning no tee times"
                    );
                }
                return Resolution::degraded();
            }
        };

        if let Err(e) = self.cache.set(key, &slots, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }

        Resolution {
            slots,
            origin: Origin::Upstream,
        }
    }

    async fn scrape(&self, course: &Course, date: NaiveDate) -> Result<Vec<TeeTimeSlot>, ScrapeError> {
        let system = course.booking_system.as_str();
        let strategy = self.strategies.for_system(course.booking_system);

        let _permit = self
            .fetch_permits
            .acquire()
            .await
            .map_err(|_| ScrapeError::Payload("fetch pool closed".to_string()))?;

        let _timer = metrics::start_upstream_timer(system);
        let started = Instant::now();

        let scrape = strategy.scrape(course, date);
        let result = match tokio::time::timeout(self.fetch_timeout, scrape).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Deadline(self.fetch_timeout)),
        };

        metrics::record_upstream_fetch(system, outcome_label(&result));

        if let Ok(slots) = &result {
            tracing::debug!(
                course_id = %course.id,
                strategy = strategy.name(),
                slots = slots.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Scraped tee times"
            );
        }

        result
    }

    /// Simultaneous upstream scrapes still allowed
    pub fn available_fetch_permits(&self) -> usize {
        self.fetch_permits.available_permits()
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }
}

/// Metric label: `success`, `timeout`, or the error category
fn outcome_label(result: &Result<Vec<TeeTimeSlot>, ScrapeError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_timeout() => "timeout",
        Err(e) => e.category().as_str(),
    }
}
