//! HTTP surface
//!
//! JSON API over the shared [`Services`]:
//!
//! | Method & Path              | Purpose                          |
//! |----------------------------|----------------------------------|
//! | `GET /courses`             | list the registry                |
//! | `GET /courses/{id}`        | one course                       |
//! | `GET /tee-times/{courseId}`| resolve one course               |
//! | `POST /tee-times/batch`    | resolve many courses, unfiltered |
//! | `GET /search/tee-times`    | filtered multi-course search     |
//! | `POST /refresh/{courseId}` | bypass the cache                 |
//! | `GET /health`              | cache and renderer status        |
//! | `GET /metrics`             | Prometheus text format           |

pub mod api;
pub mod health;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::env_override;
use crate::context::Services;
use crate::metrics;

// ============================================================================
// Configuration
// ============================================================================

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Enable CORS for API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables
    pub fn apply_env(&mut self) {
        env_override("FAIRWAY_HOST", &mut self.host);
        env_override("PORT", &mut self.port);
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the router with all routes and layers
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = api::create_router()
        .merge(health::create_health_router())
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state);

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    if config.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

/// Count requests by matched route
async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::record_http_request(
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// Serving
// ============================================================================

/// Bind the configured address
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.bind_address();
    TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    tracing::info!(address = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.enable_cors);
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        };
        let listener = bind(&config).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
