//! fairway - Tee-time availability aggregator
//!
//! Scrapes golf-course booking systems, normalizes their tee sheets into one
//! schema, caches them and serves them over a JSON API.
//!
//! # Architecture
//!
//! - [`models`] - Courses, tee-time slots and search filters
//! - [`registry`] - Read-only course list loaded at startup
//! - [`scraper`] - One strategy per booking system (browser, direct API, fallback)
//! - [`renderer`] - Headless browser used by the browser strategy
//! - [`normalizer`] - Raw records and DOM nodes to [`models::TeeTimeSlot`]
//! - [`cache`] - TTL cache (Redis or in-process)
//! - [`dispatcher`] - Cache-aside resolution of one course and date
//! - [`aggregator`] - Concurrent fan-out across courses
//! - [`scheduler`] - Periodic cache warm-up
//! - [`server`] - HTTP surface
//! - [`config`] - Configuration from environment or TOML
//! - [`metrics`] - Prometheus counters and histograms
//!
//! # Example
//!
//! ```no_run
//! use fairway::config::Config;
//! use fairway::context::Services;
//!
//! #[tokio::main]
//! async fn main() -> fairway::Result<()> {
//!     let config = Config::from_env()?;
//!     let services = Services::init(&config).await?;
//!     let course = services.registry.all()[0].clone();
//!     let today = chrono::Local::now().date_naive();
//!     let slots = services.dispatcher.resolve(&course, today).await;
//!     println!("{} tee times", slots.len());
//!     services.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod registry;
pub mod renderer;
pub mod scheduler;
pub mod scraper;
pub mod server;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggregator::Aggregator;
    pub use crate::cache::{CacheStore, MemoryCache, RedisCache};
    pub use crate::config::Config;
    pub use crate::context::Services;
    pub use crate::dispatcher::{Dispatcher, Origin, Resolution};
    pub use crate::error::{Error, ErrorCategory, FairwayErrorTrait, Result};
    pub use crate::models::{BookingSystem, Course, CourseSlots, SlotFilter, TeeTimeSlot};
    pub use crate::registry::CourseRegistry;
    pub use crate::scraper::{ScrapeStrategy, StrategySet};
}

pub use error::{Error, Result};
pub use models::{BookingSystem, Course, CourseSlots, SlotFilter, TeeTimeSlot};
