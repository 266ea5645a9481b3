//! Unified error handling for the fairway crate
//!
//! Domain errors live in [`crate::utils::error`] and are used directly inside
//! their modules. This module wraps them in a single [`Error`] for code that
//! crosses module boundaries, chiefly startup wiring.
//!
//! - [`FairwayErrorTrait`] - common interface for classification
//! - [`ErrorCategory`] - coarse grouping used for handling decisions
//! - [`Error`] - unified enum over all domain errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use fairway::error::{Error, FairwayErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), error = %err, "Transient failure");
//!     } else {
//!         tracing::error!(category = ?err.category(), error = %err, "Fatal failure");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{CacheError, FetchError, RegistryError, RenderError, ScrapeError};

/// Common trait for fairway error types
pub trait FairwayErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP, timeout, rate limit
    Network,
    /// Unusable upstream payloads and locators
    Parsing,
    /// Headless browser failures
    Rendering,
    /// Cache backend failures
    Cache,
    /// Configuration and registry errors
    Config,
    /// Invalid caller input
    Validation,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Rendering => "rendering",
            Self::Cache => "cache",
            Self::Config => "config",
            Self::Validation => "validation",
            Self::Other => "other",
        }
    }
}

impl FairwayErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimit | Self::Timeout | Self::MaxRetriesExceeded => true,
            Self::ServerError(status) => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl FairwayErrorTrait for RenderError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Exit { .. })
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Rendering
    }
}

impl FairwayErrorTrait for ScrapeError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Render(e) => e.is_recoverable(),
            Self::LocatorParse { .. } => false,
            Self::Payload(_) | Self::Deadline(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Render(e) => e.category(),
            Self::LocatorParse { .. } | Self::Payload(_) => ErrorCategory::Parsing,
            Self::Deadline(_) => ErrorCategory::Network,
        }
    }
}

/// Unified error type for the fairway crate
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream scraping failed
    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// Direct fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Renderer failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Cache backend failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Course registry could not be loaded
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Invalid caller input
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FairwayErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scrape(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Render(e) => e.is_recoverable(),
            Self::Cache(CacheError::Unavailable(_)) => true,
            Self::Cache(CacheError::Serialization(_)) => false,
            Self::Registry(_) => false,
            Self::Validation(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scrape(e) => e.category(),
            Self::Fetch(e) => e.category(),
            Self::Render(e) => e.category(),
            Self::Cache(_) => ErrorCategory::Cache,
            Self::Registry(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Io(_) | Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
