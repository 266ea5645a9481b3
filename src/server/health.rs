//! Health endpoint
//!
//! Reports cache and renderer status. Always answers 200: a degraded cache
//! still serves requests through direct fetches.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::AppState;

/// Overall or per-component status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    pub cache: ComponentHealth,
    pub renderer: ComponentHealth,
}

/// Create the health router
pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let services = &state.services;

    let start = Instant::now();
    let cache_ok = services.cache.health_check().await;
    let cache = ComponentHealth {
        status: if cache_ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        backend: Some(services.cache.backend().to_string()),
        latency_ms: start.elapsed().as_millis() as u64,
    };

    let start = Instant::now();
    let renderer_ok = services.renderer.health_check().await;
    let renderer = ComponentHealth {
        status: if renderer_ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        backend: None,
        latency_ms: start.elapsed().as_millis() as u64,
    };

    let status = if cache_ok && renderer_ok {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    if status != HealthStatus::Healthy {
        tracing::warn!(
            status = status.as_str(),
            cache = cache.status.as_str(),
            renderer = renderer.status.as_str(),
            "Health check not healthy"
        );
    }

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache,
        renderer,
    })
}
