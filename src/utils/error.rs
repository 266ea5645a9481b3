//! Error types for the fairway scrapers, renderer and cache
//!
//! This module defines the domain errors used throughout the application.
//! Upstream failures are values, not panics: strategies return them and the
//! dispatcher decides how to degrade.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded upstream (429)
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised by the headless rendering collaborator
#[derive(Error, Debug)]
pub enum RenderError {
    /// Navigation plus settle exceeded the render budget
    #[error("Render timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The browser process could not be started
    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    /// The browser exited unsuccessfully
    #[error("Renderer exited with status {status}: {stderr}")]
    Exit { status: String, stderr: String },

    /// The renderer has been shut down
    #[error("Renderer is closed")]
    Closed,

    /// Rendered output was not valid UTF-8
    #[error("Rendered page is not valid UTF-8")]
    InvalidOutput,
}

/// Failure of a single scraping strategy invocation
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Transport-level failure talking to a booking API
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Page rendering failed
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    /// The course locator does not have the shape the booking system expects
    #[error("Cannot parse locator '{locator}': expected {expected}")]
    LocatorParse {
        locator: String,
        expected: &'static str,
    },

    /// Upstream returned something that is not a usable payload
    #[error("Unusable payload: {0}")]
    Payload(String),

    /// The whole fetch, once started, outlived its per-course budget
    #[error("Fetch exceeded its {}s budget", .0.as_secs())]
    Deadline(Duration),
}

impl ScrapeError {
    /// Create a locator parse error
    pub fn locator(locator: impl Into<String>, expected: &'static str) -> Self {
        Self::LocatorParse {
            locator: locator.into(),
            expected,
        }
    }

    /// True when the failure came from a timeout on any transport
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Fetch(FetchError::Timeout)
                | Self::Render(RenderError::Timeout(_))
                | Self::Deadline(_)
        )
    }
}

/// Errors from the cache backend
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend unreachable or command failed
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Stored value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors loading the course registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry file could not be read
    #[error("Failed to read course registry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Registry file is not a valid course list
    #[error("Failed to parse course registry: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two courses share an id
    #[error("Duplicate course id '{0}'")]
    DuplicateId(String),
}
