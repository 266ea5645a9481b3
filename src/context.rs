//! Long-lived service graph
//!
//! [`Services`] owns the shared resources (course registry, cache client,
//! rendering engine) and the components built on them. It is constructed
//! once at startup, handed to the HTTP layer and the scheduler by `Arc`,
//! and torn down with [`Services::shutdown`].

use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::cache::{CacheBackend, CacheStore, MemoryCache, RedisCache};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::registry::CourseRegistry;
use crate::renderer::{ChromeRenderer, PageRenderer};
use crate::scheduler::WarmupScheduler;
use crate::scraper::StrategySet;

/// Everything a request handler or scheduler tick needs
pub struct Services {
    pub registry: Arc<CourseRegistry>,
    pub cache: Arc<dyn CacheStore>,
    pub renderer: Arc<dyn PageRenderer>,
    pub dispatcher: Arc<Dispatcher>,
    pub aggregator: Arc<Aggregator>,
    pub scheduler: Arc<WarmupScheduler>,
}

impl Services {
    /// Open every external resource. Fails on the first one that is
    /// unavailable: registry file, cache backend, browser executable.
    pub async fn init(config: &Config) -> Result<Self> {
        let registry = CourseRegistry::load(&config.registry.path).await?;

        let cache: Arc<dyn CacheStore> = match config.cache.backend {
            CacheBackend::Redis => Arc::new(RedisCache::new(&config.cache).await?),
            CacheBackend::Memory => {
                tracing::info!("Using in-process cache");
                Arc::new(MemoryCache::new())
            }
        };

        let chrome = ChromeRenderer::new(&config.renderer);
        if let Err(e) = chrome.startup_check().await {
            cache.close().await;
            return Err(e.into());
        }
        let renderer: Arc<dyn PageRenderer> = Arc::new(chrome);

        let strategies = StrategySet::from_config(
            &config.scraper,
            Arc::clone(&renderer),
            config.renderer.settle(),
        )?;

        Ok(Self::assemble(config, registry, cache, renderer, strategies))
    }

    /// Wire components around already-open resources
    pub fn assemble(
        config: &Config,
        registry: CourseRegistry,
        cache: Arc<dyn CacheStore>,
        renderer: Arc<dyn PageRenderer>,
        strategies: StrategySet,
    ) -> Self {
        let registry = Arc::new(registry);

        let dispatcher = Arc::new(
            Dispatcher::new(
                Arc::clone(&cache),
                strategies,
                config.cache.ttl(),
                config.scraper.max_concurrent_fetches,
            )
            .with_fetch_timeout(config.scraper.course_timeout()),
        );

        let aggregator = Arc::new(Aggregator::new(Arc::clone(&dispatcher), Arc::clone(&registry)));

        let scheduler = Arc::new(WarmupScheduler::new(
            Arc::clone(&dispatcher),
            Arc::clone(&registry),
            config.scheduler.clone(),
        ));

        Self {
            registry,
            cache,
            renderer,
            dispatcher,
            aggregator,
            scheduler,
        }
    }

    /// Release the rendering engine and cache connections
    pub async fn shutdown(&self) {
        self.renderer.close().await;
        self.cache.close().await;
        tracing::info!("Shared resources released");
    }
}
