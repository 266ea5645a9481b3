//! Periodic cache warm-up
//!
//! On every tick the scheduler resolves every registered course for today
//! and tomorrow (computed when the run starts) through the dispatcher, so
//! user requests mostly hit a warm cache.
//!
//! Runs never overlap. A tick that fires while the previous run is still in
//! flight is skipped. On shutdown the loop stops ticking and waits only for
//! the run already in flight.
//!
//! A run keeps at most `max_concurrent` resolutions going at once, leaving
//! the rest of the dispatcher's fetch permits to user requests.

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dispatcher::{Dispatcher, Origin};
use crate::metrics;
use crate::models::Course;
use crate::registry::CourseRegistry;

// ============================================================================
// Configuration
// ============================================================================

/// Warm-up scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the scheduler alongside the HTTP server
    pub enabled: bool,

    /// Seconds between ticks
    pub interval_secs: u64,

    /// Fire the first run immediately instead of after one interval
    pub run_on_startup: bool,

    /// Resolutions a run keeps in flight at once
    pub max_concurrent: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 900,
            run_on_startup: false,
            max_concurrent: 2,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// Summary of one warm-up run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmupReport {
    pub dates: Vec<NaiveDate>,
    pub courses: usize,
    /// Course/date pairs resolved
    pub resolutions: usize,
    /// Served from a still-live cache entry
    pub cached: usize,
    /// Upstream failed or timed out
    pub failed: usize,
    pub slots: usize,
    pub elapsed_ms: u64,
}

/// Clears the in-flight flag when the run ends, however it ends
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
        metrics::set_warmup_in_flight(false);
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Periodic warm-up through the dispatcher
pub struct WarmupScheduler {
    dispatcher: Arc<Dispatcher>,
    registry: Arc<CourseRegistry>,
    config: SchedulerConfig,
    in_flight: Arc<AtomicBool>,
}

impl WarmupScheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, registry: Arc<CourseRegistry>, config: SchedulerConfig) -> Self {
        Self {
            dispatcher,
            registry,
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Claim the in-flight flag, or log the skip
    fn begin(&self) -> Option<InFlight> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::info!("Previous warm-up still running, skipping this trigger");
            metrics::record_warmup_run("skipped");
            return None;
        }
        metrics::set_warmup_in_flight(true);
        Some(InFlight(Arc::clone(&self.in_flight)))
    }

    /// One warm-up run for today and tomorrow; `None` when skipped
    pub async fn run_once(&self) -> Option<WarmupReport> {
        let _guard = self.begin()?;
        Some(self.run_for(Local::now().date_naive()).await)
    }

    /// Resolve every course for `today` and the day after.
    ///
    /// Does not take the in-flight flag.
    pub async fn run_for(&self, today: NaiveDate) -> WarmupReport {
        let started = Instant::now();
        let dates: Vec<NaiveDate> = std::iter::once(today).chain(today.succ_opt()).collect();
        let courses = self.registry.all();

        tracing::info!(courses = courses.len(), from = %today, "Warm-up run started");

        let pairs: Vec<(Course, NaiveDate)> = courses
            .iter()
            .flat_map(|course| dates.iter().map(move |date| (course.clone(), *date)))
            .collect();
        let concurrency = self
            .config
            .max_concurrent
            .clamp(1, self.dispatcher.max_concurrent_fetches());

        // Tasks are spawned only as buffer slots free up
        let results: Vec<_> = stream::iter(pairs)
            .map(|(course, date)| {
                let dispatcher = Arc::clone(&self.dispatcher);
                tokio::spawn(async move { dispatcher.lookup(&course, date).await })
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = WarmupReport {
            dates: dates.clone(),
            courses: courses.len(),
            resolutions: results.len(),
            cached: 0,
            failed: 0,
            slots: 0,
            elapsed_ms: 0,
        };

        for result in results {
            match result {
                Ok(resolution) => {
                    report.slots += resolution.slots.len();
                    match resolution.origin {
                        Origin::Cache => report.cached += 1,
                        Origin::Degraded => report.failed += 1,
                        Origin::Upstream => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Warm-up task failed");
                    report.failed += 1;
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        metrics::record_warmup_run("completed");

        tracing::info!(
            resolutions = report.resolutions,
            cached = report.cached,
            failed = report.failed,
            slots = report.slots,
            elapsed_ms = report.elapsed_ms,
            "Warm-up run finished"
        );

        report
    }

    /// Start the tick loop. Stops when `shutdown` flips to `true` or its
    /// sender is dropped, after the in-flight run (if any) completes.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            if !self.config.run_on_startup {
                // The first tick completes immediately.
                ticker.tick().await;
            }

            tracing::info!(
                interval_secs = self.config.interval().as_secs(),
                run_on_startup = self.config.run_on_startup,
                "Warm-up scheduler started"
            );

            let mut current: Option<JoinHandle<()>> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(guard) = self.begin() else {
                            continue;
                        };
                        let this = Arc::clone(&self);
                        current = Some(tokio::spawn(async move {
                            let _guard = guard;
                            this.run_for(Local::now().date_naive()).await;
                        }));
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            if let Some(handle) = current {
                if !handle.is_finished() {
                    tracing::info!("Waiting for in-flight warm-up run");
                }
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "Warm-up run aborted");
                }
            }

            tracing::info!("Warm-up scheduler stopped");
        })
    }
}
