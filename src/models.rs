// Core data structures for fairway

use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking platform a course takes reservations through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSystem {
    /// Availability only visible in a JavaScript-rendered page
    BrowserRendered,
    /// Facility API addressed by two numeric ids
    DirectApiA,
    /// Club API addressed by a slug
    DirectApiB,
    /// Anything the registry tags with a platform we do not support
    #[serde(other)]
    Unknown,
}

impl BookingSystem {
    /// Every variant, in declaration order
    pub const ALL: [BookingSystem; 4] = [
        Self::BrowserRendered,
        Self::DirectApiA,
        Self::DirectApiB,
        Self::Unknown,
    ];

    /// Tag used in cache keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrowserRendered => "browser_rendered",
            Self::DirectApiA => "direct_api_a",
            Self::DirectApiB => "direct_api_b",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BookingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A golf course from the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub booking_system: BookingSystem,
    /// Opaque URL or identifier the booking system understands
    pub source_locator: String,
    pub city: String,
}

/// One bookable tee time in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeeTimeSlot {
    /// Display label, never empty
    pub time: String,
    /// Green fee; absent when the upstream did not publish one
    pub price: Option<f64>,
    pub available_slots: u32,
    pub holes: u8,
    pub is_hot_deal: bool,
}

impl TeeTimeSlot {
    pub const DEFAULT_AVAILABLE_SLOTS: u32 = 4;
    pub const DEFAULT_HOLES: u8 = 18;

    /// Slot with only the required field set and defaults elsewhere
    pub fn at(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            price: None,
            available_slots: Self::DEFAULT_AVAILABLE_SLOTS,
            holes: Self::DEFAULT_HOLES,
            is_hot_deal: false,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_slots(mut self, available_slots: u32) -> Self {
        self.available_slots = available_slots;
        self
    }

    pub fn with_holes(mut self, holes: u8) -> Self {
        self.holes = holes;
        self
    }

    pub fn hot_deal(mut self) -> Self {
        self.is_hot_deal = true;
        self
    }
}

/// Search filter applied after resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFilter {
    pub max_price: Option<f64>,
    pub min_slots: u32,
}

impl Default for SlotFilter {
    fn default() -> Self {
        Self {
            max_price: None,
            min_slots: 1,
        }
    }
}

impl SlotFilter {
    /// Keep a slot iff it is within budget and has enough open spots.
    ///
    /// A slot without a price passes any price ceiling.
    pub fn matches(&self, slot: &TeeTimeSlot) -> bool {
        let within_budget = match (self.max_price, slot.price) {
            (Some(max), Some(price)) => price <= max,
            _ => true,
        };
        within_budget && slot.available_slots >= self.min_slots
    }

    pub fn apply(&self, slots: &[TeeTimeSlot]) -> Vec<TeeTimeSlot> {
        slots.iter().filter(|s| self.matches(s)).cloned().collect()
    }
}

/// Resolved tee times for one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSlots {
    pub course: Course,
    pub tee_times: Vec<TeeTimeSlot>,
}
