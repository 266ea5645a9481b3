//! Strategies for booking systems with a public JSON API
//!
//! Both supported APIs are addressed by identifiers embedded in the
//! course's `sourceLocator`:
//!
//! - Facility API: two numeric path segments, `.../<facilityId>/.../<courseId>`,
//!   queried at `<origin>/api/tee-times?facilityId=..&courseId=..&date=..`
//! - Club slug API: the last path segment is a slug, queried at
//!   `<origin>/api/v1/clubs/<slug>/tee-times?date=..`
//!
//! Requests go through a shared [`DirectApiClient`] with rate limiting,
//! user-agent rotation and retry with exponential backoff.

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT},
    Client,
};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{RawPayload, ScrapeStrategy};
use crate::models::Course;
use crate::utils::error::{FetchError, ScrapeError};

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Keys under which booking APIs nest their slot arrays
const ENVELOPE_KEYS: &[&str] = &["teeTimes", "tee_times", "times", "slots", "data", "results"];

/// Rate-limited JSON client shared by the direct API strategies
pub struct DirectApiClient {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay for exponential backoff
    base_delay: Duration,

    /// Optional origin override for testing with mock servers
    base_url: Option<String>,
}

impl DirectApiClient {
    /// Create a client with default settings
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 2, Duration::from_secs(10))
    }

    /// Create a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            max_retries,
            base_delay: Duration::from_millis(500),
            base_url: None,
        })
    }

    /// Send every request to `base_url` instead of the locator's origin
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    /// Override the backoff base delay
    pub fn with_backoff(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Origin to use for a locator
    fn origin_for(&self, locator: &Url) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| locator.origin().ascii_serialization())
    }

    /// GET a JSON document with rate limiting and retry. Every attempt,
    /// retries included, waits on the rate limiter.
    pub async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2_u32.pow(attempt - 1);
                tracing::debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "Retrying request");
                tokio::time::sleep(delay).await;
            }

            self.rate_limiter.until_ready().await;

            let headers = self.build_headers(&url.origin().ascii_serialization());

            match self.client.get(url.as_str()).headers(headers).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let bytes = response.bytes().await?;
                        return serde_json::from_slice(&bytes)
                            .map_err(|e| FetchError::Decode(e.to_string()));
                    } else if Self::should_retry(status.as_u16()) {
                        last_error = Some(if status.as_u16() == 429 {
                            FetchError::RateLimit
                        } else {
                            FetchError::ServerError(status.as_u16())
                        });
                        continue;
                    } else {
                        return Err(FetchError::ServerError(status.as_u16()));
                    }
                }
                Err(e) if e.is_timeout() => last_error = Some(FetchError::Timeout),
                Err(e) => last_error = Some(FetchError::Http(e)),
            }
        }

        match last_error {
            Some(FetchError::Timeout) => Err(FetchError::Timeout),
            _ => Err(FetchError::MaxRetriesExceeded),
        }
    }

    /// Retry on 429 and transient 5xx only
    fn should_retry(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }

    fn build_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain;q=0.9, */*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        if let Ok(referer_value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, referer_value);
        }

        headers
    }

    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
    }
}

/// Which direct API a strategy speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectApiVariant {
    /// Facility id + course id
    Facility,
    /// Club slug
    ClubSlug,
}

/// Identifiers parsed out of a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorIds {
    Facility { facility_id: String, course_id: String },
    ClubSlug { slug: String },
}

impl DirectApiVariant {
    fn expected(&self) -> &'static str {
        match self {
            Self::Facility => "a URL with two numeric path segments",
            Self::ClubSlug => "a URL ending in a club slug",
        }
    }

    /// Parse the locator into a URL and the identifiers this API needs
    pub fn parse_locator(&self, locator: &str) -> Result<(Url, LocatorIds), ScrapeError> {
        let url = Url::parse(locator.trim()).map_err(|_| ScrapeError::locator(locator, self.expected()))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let ids = match self {
            Self::Facility => {
                let mut numeric = segments
                    .iter()
                    .filter(|seg| seg.chars().all(|c| c.is_ascii_digit()));
                match (numeric.next(), numeric.next()) {
                    (Some(facility), Some(course)) => LocatorIds::Facility {
                        facility_id: facility.to_string(),
                        course_id: course.to_string(),
                    },
                    _ => return Err(ScrapeError::locator(locator, self.expected())),
                }
            }
            Self::ClubSlug => match segments.last() {
                Some(slug) if is_slug(slug) => LocatorIds::ClubSlug {
                    slug: slug.to_string(),
                },
                _ => return Err(ScrapeError::locator(locator, self.expected())),
            },
        };

        Ok((url, ids))
    }
}

fn is_slug(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && segment.chars().any(|c| c.is_ascii_lowercase())
}

/// Find the slot array in an API response body
pub fn extract_records(body: Value) -> Result<Vec<Value>, ScrapeError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => {
            for key in ENVELOPE_KEYS {
                match obj.remove(*key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(nested @ Value::Object(_)) => return extract_records(nested),
                    _ => {}
                }
            }
            Err(ScrapeError::Payload("no tee-time array in response".to_string()))
        }
        Value::Null => Ok(Vec::new()),
        other => Err(ScrapeError::Payload(format!(
            "expected array or object, got {}",
            crate::utils::truncate_text(&other.to_string(), 40)
        ))),
    }
}

/// Strategy for the facility and club-slug booking APIs
pub struct DirectApiStrategy {
    variant: DirectApiVariant,
    client: Arc<DirectApiClient>,
}

impl DirectApiStrategy {
    pub fn new(variant: DirectApiVariant, client: Arc<DirectApiClient>) -> Self {
        Self { variant, client }
    }

    /// Upstream request URL for a course on a date
    pub fn request_url(&self, locator: &str, date: NaiveDate) -> Result<Url, ScrapeError> {
        let (url, ids) = self.variant.parse_locator(locator)?;
        let origin = self.client.origin_for(&url);
        let date = date.format("%Y-%m-%d").to_string();

        let request = match ids {
            LocatorIds::Facility {
                facility_id,
                course_id,
            } => Url::parse_with_params(
                &format!("{origin}/api/tee-times"),
                &[
                    ("facilityId", facility_id.as_str()),
                    ("courseId", course_id.as_str()),
                    ("date", date.as_str()),
                ],
            ),
            LocatorIds::ClubSlug { slug } => Url::parse_with_params(
                &format!("{origin}/api/v1/clubs/{slug}/tee-times"),
                &[("date", date.as_str())],
            ),
        };

        request.map_err(|e| ScrapeError::Fetch(FetchError::InvalidUrl(e.to_string())))
    }
}

#[async_trait]
impl ScrapeStrategy for DirectApiStrategy {
    fn name(&self) -> &'static str {
        match self.variant {
            DirectApiVariant::Facility => "direct_api_a",
            DirectApiVariant::ClubSlug => "direct_api_b",
        }
    }

    async fn fetch_raw(&self, course: &Course, date: NaiveDate) -> Result<RawPayload, ScrapeError> {
        let url = self.request_url(&course.source_locator, date)?;
        tracing::debug!(course_id = %course.id, url = %url, "Querying booking API");

        let body = self.client.get_json(&url).await?;
        let records = extract_records(body)?;

        if records.is_empty() {
            return Ok(RawPayload::Empty);
        }
        Ok(RawPayload::Json(records))
    }
}
