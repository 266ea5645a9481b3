//! Prometheus metrics for the tee-time service
//!
//! This module tracks:
//! - Cache: lookups by result (hit, miss, error)
//! - Upstream: fetches by booking system and outcome, fetch duration
//! - Warm-up: scheduler runs by outcome
//! - HTTP: requests by route and status, request duration
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Cache and upstream metrics
struct ResolveMetrics {
    cache_lookups: CounterVec,
    upstream_fetches: CounterVec,
    upstream_duration: HistogramVec,
    warmup_runs: CounterVec,
    warmup_in_flight: Gauge,
}

/// HTTP surface metrics
struct HttpMetrics {
    requests: CounterVec,
    duration: HistogramVec,
}

static RESOLVE_METRICS: OnceLock<ResolveMetrics> = OnceLock::new();

static HTTP_METRICS: OnceLock<HttpMetrics> = OnceLock::new();

/// Outcome of the first initialization attempt
static METRICS_INIT: OnceLock<Result<(), String>> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once. If registration fails the error is returned
/// and every recording function stays a no-op.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = fairway::metrics::init_metrics() {
///     tracing::warn!(error = %e, "Metrics disabled");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    METRICS_INIT
        .get_or_init(|| register_all().map_err(|e| e.to_string()))
        .clone()
        .map_err(Into::into)
}

fn register_all() -> Result<(), Box<dyn std::error::Error>> {
    let resolve = ResolveMetrics {
        cache_lookups: register_counter_vec!(
            "fairway_cache_lookups_total",
            "Cache lookups by result",
            &["result"]
        )?,
        upstream_fetches: register_counter_vec!(
            "fairway_upstream_fetches_total",
            "Upstream scrapes by booking system and outcome",
            &["booking_system", "outcome"]
        )?,
        upstream_duration: register_histogram_vec!(
            "fairway_upstream_fetch_duration_seconds",
            "Upstream scrape duration in seconds",
            &["booking_system"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0]
        )?,
        warmup_runs: register_counter_vec!(
            "fairway_warmup_runs_total",
            "Scheduled warm-up runs by outcome",
            &["outcome"]
        )?,
        warmup_in_flight: register_gauge!(
            "fairway_warmup_in_flight",
            "Whether a warm-up run is in progress (1 = yes, 0 = no)"
        )?,
    };

    let http = HttpMetrics {
        requests: register_counter_vec!(
            "fairway_http_requests_total",
            "HTTP requests by route and status",
            &["route", "status"]
        )?,
        duration: register_histogram_vec!(
            "fairway_http_request_duration_seconds",
            "HTTP request duration in seconds",
            &["route"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
    };

    RESOLVE_METRICS
        .set(resolve)
        .map_err(|_| "Resolve metrics already initialized")?;
    HTTP_METRICS
        .set(http)
        .map_err(|_| "HTTP metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    RESOLVE_METRICS.get().is_some() && HTTP_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
    Error,
}

impl CacheLookup {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
        }
    }
}

pub fn record_cache_lookup(result: CacheLookup) {
    if let Some(m) = RESOLVE_METRICS.get() {
        m.cache_lookups.with_label_values(&[result.as_str()]).inc();
    }
}

/// Record an upstream scrape; `outcome` is `success`, `timeout` or an error category
pub fn record_upstream_fetch(booking_system: &str, outcome: &str) {
    if let Some(m) = RESOLVE_METRICS.get() {
        m.upstream_fetches
            .with_label_values(&[booking_system, outcome])
            .inc();
    }
}

/// Record a warm-up run; `outcome` is `completed` or `skipped`
pub fn record_warmup_run(outcome: &str) {
    if let Some(m) = RESOLVE_METRICS.get() {
        m.warmup_runs.with_label_values(&[outcome]).inc();
    }
}

pub fn set_warmup_in_flight(in_flight: bool) {
    if let Some(m) = RESOLVE_METRICS.get() {
        m.warmup_in_flight.set(if in_flight { 1.0 } else { 0.0 });
    }
}

/// Record HTTP request
pub fn record_http_request(route: &str, status: u16, duration_secs: f64) {
    let Some(m) = HTTP_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.requests.with_label_values(&[route, &status_str]).inc();
    m.duration.with_label_values(&[route]).observe(duration_secs);
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start an upstream fetch timer
pub fn start_upstream_timer(booking_system: &str) -> MetricsTimer {
    match RESOLVE_METRICS.get() {
        Some(m) => MetricsTimer::new(
            m.upstream_duration
                .with_label_values(&[booking_system])
                .start_timer(),
        ),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(metrics_initialized());
    }

    #[test]
    fn test_recording_and_encoding() {
        let _ = init_metrics();

        record_cache_lookup(CacheLookup::Hit);
        record_cache_lookup(CacheLookup::Miss);
        record_upstream_fetch("direct_api_a", "success");
        record_warmup_run("skipped");
        set_warmup_in_flight(false);
        record_http_request("/health", 200, 0.002);
        {
            let _timer = start_upstream_timer("browser_rendered");
        }

        let text = encode_metrics().unwrap();
        assert!(text.contains("fairway_cache_lookups_total"));
        assert!(text.contains("fairway_upstream_fetches_total"));
        assert!(text.contains("fairway_http_requests_total"));
    }

    #[test]
    fn test_noop_timer() {
        let timer = MetricsTimer::noop();
        drop(timer);
    }
}
