//! Strategy for courses on booking systems we cannot scrape

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{RawPayload, ScrapeStrategy};
use crate::models::{Course, TeeTimeSlot};
use crate::utils::error::ScrapeError;

/// What an unsupported booking system resolves to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// No availability. Never fabricates tee times.
    #[default]
    Empty,
    /// Fixed demo sheet
    Sample,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "sample" => Ok(Self::Sample),
            other => Err(format!("unknown fallback policy '{other}'")),
        }
    }
}

/// Demo tee sheet served under [`FallbackPolicy::Sample`]
pub fn sample_sheet() -> Vec<TeeTimeSlot> {
    vec![
        TeeTimeSlot::at("7:00 AM").with_price(45.0),
        TeeTimeSlot::at("9:30 AM").with_price(39.0).with_slots(2).hot_deal(),
        TeeTimeSlot::at("2:10 PM").with_price(29.0).with_holes(9),
    ]
}

/// Never fails, never touches the network
pub struct FallbackStrategy {
    policy: FallbackPolicy,
}

impl FallbackStrategy {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }
}

#[async_trait]
impl ScrapeStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn fetch_raw(&self, course: &Course, _date: NaiveDate) -> Result<RawPayload, ScrapeError> {
        tracing::debug!(course_id = %course.id, policy = ?self.policy, "Unsupported booking system");
        Ok(RawPayload::Empty)
    }

    fn parse(&self, _payload: RawPayload) -> Vec<TeeTimeSlot> {
        match self.policy {
            FallbackPolicy::Empty => Vec::new(),
            FallbackPolicy::Sample => sample_sheet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingSystem;

    fn course() -> Course {
        Course {
            id: "mystery".into(),
            name: "Mystery Links".into(),
            booking_system: BookingSystem::Unknown,
            source_locator: "n/a".into(),
            city: "Tulsa".into(),
        }
    }

    #[tokio::test]
    async fn test_empty_policy() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let slots = FallbackStrategy::new(FallbackPolicy::Empty)
            .scrape(&course(), date)
            .await
            .unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_sample_policy() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let slots = FallbackStrategy::new(FallbackPolicy::Sample)
            .scrape(&course(), date)
            .await
            .unwrap();
        assert_eq!(slots, sample_sheet());
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("Sample".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Sample));
        assert_eq!(FallbackPolicy::default(), FallbackPolicy::Empty);
        assert!("random".parse::<FallbackPolicy>().is_err());
    }
}
