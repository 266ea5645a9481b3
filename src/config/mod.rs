//! Configuration management for fairway
//!
//! Configuration comes from an optional TOML file, then environment
//! variables on top. Every section has defaults, so a file only needs the
//! values it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cache::{CacheBackend, CacheConfig};
use crate::error::{Error, Result};
use crate::renderer::RendererConfig;
use crate::scheduler::SchedulerConfig;
use crate::scraper::ScraperConfig;
use crate::server::ServerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,

    /// Tee-time cache
    pub cache: CacheConfig,

    /// Headless browser
    pub renderer: RendererConfig,

    /// Upstream scraping
    pub scraper: ScraperConfig,

    /// Warm-up scheduler
    pub scheduler: SchedulerConfig,

    /// Course registry
    pub registry: RegistryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the course list lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON course list
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/courses.json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Overwrite `target` with the parsed env var. Unset or unparseable
/// values leave it untouched.
pub(crate) fn env_override<T: FromStr>(key: &str, target: &mut T) {
    if let Some(value) = std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok()) {
        *target = value;
    }
}

impl Config {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file when given, otherwise from defaults; the
    /// environment overrides either way
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply every environment variable that is set
    pub fn apply_env(&mut self) -> Result<()> {
        self.server.apply_env();
        self.cache.apply_env()?;
        self.renderer.apply_env();

        let scraper = &mut self.scraper;
        env_override("FAIRWAY_API_TIMEOUT", &mut scraper.api_timeout_secs);
        env_override("FAIRWAY_MAX_CONCURRENT_FETCHES", &mut scraper.max_concurrent_fetches);
        env_override("FAIRWAY_RATE_LIMIT", &mut scraper.rate_limit);
        env_override("FAIRWAY_MAX_RETRIES", &mut scraper.max_retries);
        env_override("FAIRWAY_COURSE_TIMEOUT", &mut scraper.course_timeout_secs);
        if let Ok(policy) = std::env::var("FAIRWAY_FALLBACK_POLICY") {
            scraper.fallback_policy = policy.parse().map_err(Error::config)?;
        }

        let scheduler = &mut self.scheduler;
        env_override("FAIRWAY_SCHEDULER_ENABLED", &mut scheduler.enabled);
        env_override("FAIRWAY_WARMUP_INTERVAL", &mut scheduler.interval_secs);
        env_override("FAIRWAY_WARMUP_ON_STARTUP", &mut scheduler.run_on_startup);
        env_override("FAIRWAY_WARMUP_CONCURRENCY", &mut scheduler.max_concurrent);

        env_override("FAIRWAY_COURSES", &mut self.registry.path);
        env_override("FAIRWAY_LOG_LEVEL", &mut self.logging.level);
        env_override("FAIRWAY_LOG_FORMAT", &mut self.logging.format);

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::with_source(format!("Failed to read config file: {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::with_source(
                format!("Failed to parse TOML config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be greater than 0"));
        }

        if self.cache.ttl_secs == 0 {
            return Err(Error::config("cache.ttl_secs must be greater than 0"));
        }

        if self.cache.backend == CacheBackend::Redis && self.cache.pool_size == 0 {
            return Err(Error::config("cache.pool_size must be greater than 0"));
        }

        if self.renderer.render_timeout_secs == 0 {
            return Err(Error::config("renderer.render_timeout_secs must be greater than 0"));
        }

        if self.renderer.max_pages == 0 {
            return Err(Error::config("renderer.max_pages must be greater than 0"));
        }

        if self.renderer.settle() > self.renderer.render_timeout() {
            return Err(Error::config(
                "renderer.settle_ms must not exceed renderer.render_timeout_secs",
            ));
        }

        if self.scraper.max_concurrent_fetches == 0 {
            return Err(Error::config("scraper.max_concurrent_fetches must be greater than 0"));
        }

        if self.scraper.api_timeout_secs == 0 || self.scraper.course_timeout_secs == 0 {
            return Err(Error::config("scraper timeouts must be greater than 0"));
        }

        if self.scraper.rate_limit == 0 {
            return Err(Error::config("scraper.rate_limit must be greater than 0"));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(Error::config("scheduler.interval_secs must be greater than 0"));
        }

        if self.scheduler.max_concurrent == 0 {
            return Err(Error::config("scheduler.max_concurrent must be greater than 0"));
        }

        Ok(())
    }
}
