//! Tests for configuration loading

use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use fairway::cache::CacheBackend;
use fairway::config::Config;
use fairway::error::Error;
use fairway::scraper::FallbackPolicy;

const VARS: &[&str] = &[
    "FAIRWAY_CACHE_BACKEND",
    "FAIRWAY_CACHE_TTL",
    "FAIRWAY_FALLBACK_POLICY",
    "FAIRWAY_MAX_CONCURRENT_FETCHES",
    "FAIRWAY_COURSE_TIMEOUT",
    "FAIRWAY_SCHEDULER_ENABLED",
    "FAIRWAY_WARMUP_INTERVAL",
    "FAIRWAY_COURSES",
    "FAIRWAY_LOG_FORMAT",
    "FAIRWAY_WARMUP_CONCURRENCY",
    "PORT",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.cache.backend, CacheBackend::Redis);
    assert_eq!(config.cache.ttl(), Duration::from_secs(900));
    assert_eq!(config.scraper.fallback_policy, FallbackPolicy::Empty);
    assert!(config.scheduler.enabled);
    assert_eq!(config.registry.path.to_str(), Some("data/courses.json"));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("FAIRWAY_CACHE_BACKEND", "memory");
    std::env::set_var("FAIRWAY_CACHE_TTL", "60");
    std::env::set_var("FAIRWAY_FALLBACK_POLICY", "sample");
    std::env::set_var("FAIRWAY_MAX_CONCURRENT_FETCHES", "2");
    std::env::set_var("FAIRWAY_COURSE_TIMEOUT", "20");
    std::env::set_var("FAIRWAY_SCHEDULER_ENABLED", "false");
    std::env::set_var("FAIRWAY_WARMUP_INTERVAL", "300");
    std::env::set_var("FAIRWAY_COURSES", "/etc/fairway/courses.json");
    std::env::set_var("FAIRWAY_LOG_FORMAT", "json");
    std::env::set_var("PORT", "8080");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.scraper.fallback_policy, FallbackPolicy::Sample);
    assert_eq!(config.scraper.max_concurrent_fetches, 2);
    assert_eq!(config.scraper.course_timeout(), Duration::from_secs(20));
    assert!(!config.scheduler.enabled);
    assert_eq!(config.scheduler.interval(), Duration::from_secs(300));
    assert_eq!(config.registry.path.to_str(), Some("/etc/fairway/courses.json"));
    assert_eq!(config.logging.format, "json");
}

#[test]
#[serial]
fn test_unparseable_numbers_fall_back_to_defaults() {
    clear_env();
    std::env::set_var("FAIRWAY_MAX_CONCURRENT_FETCHES", "many");
    std::env::set_var("PORT", "-1");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.scraper.max_concurrent_fetches, 5);
    assert_eq!(config.server.port, 3000);
}

#[test]
#[serial]
fn test_unknown_fallback_policy_is_rejected() {
    clear_env();
    std::env::set_var("FAIRWAY_FALLBACK_POLICY", "invent");

    let result = Config::from_env();
    clear_env();

    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("invent")));
}

#[test]
#[serial]
fn test_unknown_cache_backend_is_rejected() {
    clear_env();
    std::env::set_var("FAIRWAY_CACHE_BACKEND", "memcached");

    let result = Config::from_env();
    clear_env();

    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("memcached")));
}

#[test]
#[serial]
fn test_env_overrides_config_file() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 9000

[cache]
backend = "memory"
ttl_secs = 120

[scheduler]
max_concurrent = 3
"#
    )
    .unwrap();
    std::env::set_var("PORT", "9100");
    std::env::set_var("FAIRWAY_WARMUP_CONCURRENCY", "4");

    let config = Config::load(Some(file.path())).unwrap();
    clear_env();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.scheduler.max_concurrent, 4);
    // Untouched by the environment
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.ttl_secs, 120);
}

#[test]
#[serial]
fn test_load_without_file_matches_from_env() {
    clear_env();
    std::env::set_var("FAIRWAY_CACHE_BACKEND", "Memory");

    let config = Config::load(None).unwrap();
    clear_env();

    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.server.port, 3000);
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 9000
enable_cors = false

[cache]
backend = "memory"
ttl_secs = 120

[renderer]
executable = "/usr/bin/chromium-browser"
max_pages = 3

[scheduler]
interval_secs = 600
run_on_startup = true

[registry]
path = "fixtures/courses.json"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.port, 9000);
    assert!(!config.server.enable_cors);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.ttl_secs, 120);
    assert_eq!(config.renderer.max_pages, 3);
    assert_eq!(config.renderer.render_timeout_secs, 30);
    assert!(config.scheduler.run_on_startup);
    assert_eq!(config.scraper.rate_limit, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_file_errors() {
    let missing = Config::from_file(std::path::Path::new("/nonexistent/fairway.toml"));
    assert!(missing.is_err());

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = \"not a number\"").unwrap();
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML"));
}

#[test]
fn test_sample_registry_file_parses() {
    let json = std::fs::read_to_string("data/courses.json").expect("data/courses.json should exist");
    let registry = fairway::registry::CourseRegistry::from_json(&json).unwrap();
    assert!(!registry.is_empty());
    assert!(registry.all().iter().any(|c| c.booking_system == fairway::BookingSystem::Unknown));
}
