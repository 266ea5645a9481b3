//! Field normalization from heterogeneous upstream records
//!
//! Booking systems disagree on field names, types and even whether a field
//! exists. Every canonical field is looked up through an ordered list of
//! candidate source names; the first present, non-null candidate wins and is
//! coerced with a per-field rule:
//!
//! | Field            | Rule                                            | Default  |
//! |------------------|-------------------------------------------------|----------|
//! | `time`           | non-empty string, required                      | drop row |
//! | `price`          | first numeric token, digits and `.` only, ≥ 0   | absent   |
//! | `availableSlots` | integer                                         | 4        |
//! | `holes`          | 9 or 18                                         | 18       |
//! | `isHotDeal`      | boolean field, or marker keyword in free text   | false    |
//!
//! Normalization never fails a batch: a record without a usable `time` is
//! skipped and the rest are still normalized.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::TeeTimeSlot;
use crate::utils::normalize_whitespace;

/// Candidate source names for the display time
pub const TIME_FIELDS: &[&str] = &[
    "time",
    "teeTime",
    "tee_time",
    "startTime",
    "start_time",
    "displayTime",
    "display_time",
];

/// Candidate source names for the green fee
pub const PRICE_FIELDS: &[&str] = &[
    "price",
    "greenFee",
    "green_fee",
    "rate",
    "amount",
    "cost",
    "displayPrice",
];

/// Candidate source names for open player spots
pub const SLOTS_FIELDS: &[&str] = &[
    "availableSlots",
    "available_slots",
    "availableSpots",
    "spots",
    "openSpots",
    "players",
    "maxPlayers",
];

/// Candidate source names for the hole count
pub const HOLES_FIELDS: &[&str] = &["holes", "numHoles", "num_holes", "holeCount"];

/// Candidate boolean flags marking a discounted time
pub const HOT_DEAL_FLAGS: &[&str] = &["isHotDeal", "is_hot_deal", "hotDeal", "hot_deal", "isDeal"];

/// Free-text fields scanned for a hot-deal keyword
pub const HOT_DEAL_TEXT_FIELDS: &[&str] = &[
    "tags",
    "badge",
    "label",
    "promotion",
    "description",
    "className",
    "text",
];

const HOT_DEAL_KEYWORDS: &[&str] = &["hot deal", "hot-deal", "hot_deal", "hotdeal"];

/// Raw DOM node captured from a rendered page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNode {
    /// Visible text content
    pub text: String,
    /// CSS classes on the node
    pub classes: Vec<String>,
    /// `data-*` attributes, keyed without the `data-` prefix
    pub data: BTreeMap<String, String>,
}

/// Normalize a batch of JSON records, skipping the malformed ones
pub fn normalize_records(records: &[Value]) -> Vec<TeeTimeSlot> {
    let slots: Vec<TeeTimeSlot> = records.iter().filter_map(normalize_record).collect();

    if slots.len() < records.len() {
        tracing::debug!(
            total = records.len(),
            kept = slots.len(),
            "Dropped records without a tee time"
        );
    }

    slots
}

/// Normalize one JSON record; `None` when it has no usable `time`
pub fn normalize_record(record: &Value) -> Option<TeeTimeSlot> {
    let obj = record.as_object()?;

    let time = pick(obj, TIME_FIELDS).and_then(coerce_time)?;

    let price = pick(obj, PRICE_FIELDS).and_then(coerce_price);

    let available_slots = pick(obj, SLOTS_FIELDS)
        .and_then(coerce_count)
        .unwrap_or(TeeTimeSlot::DEFAULT_AVAILABLE_SLOTS);

    let holes = pick(obj, HOLES_FIELDS)
        .and_then(coerce_count)
        .map(coerce_holes)
        .unwrap_or(TeeTimeSlot::DEFAULT_HOLES);

    let is_hot_deal = pick(obj, HOT_DEAL_FLAGS).is_some_and(coerce_flag)
        || HOT_DEAL_TEXT_FIELDS
            .iter()
            .filter_map(|f| obj.get(*f))
            .any(mentions_hot_deal);

    Some(TeeTimeSlot {
        time,
        price,
        available_slots,
        holes,
        is_hot_deal,
    })
}

/// Normalize DOM nodes matched on a rendered booking page
pub fn normalize_nodes(nodes: &[RawNode]) -> Vec<TeeTimeSlot> {
    let records: Vec<Value> = nodes.iter().map(node_to_record).collect();
    normalize_records(&records)
}

/// Lift a DOM node into a record with canonical field names.
///
/// `data-*` attributes take precedence over values scraped from text.
pub fn node_to_record(node: &RawNode) -> Value {
    let text = normalize_whitespace(&node.text);
    let mut record = Map::new();

    let data = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| node.data.get(*k))
            .map(|v| Value::String(v.clone()))
    };

    if let Some(time) = data(&["time", "tee-time", "teetime"]).or_else(|| text_time(&text)) {
        record.insert("time".into(), time);
    }
    if let Some(price) = data(&["price", "rate"]).or_else(|| text_price(&text)) {
        record.insert("price".into(), price);
    }
    if let Some(slots) = data(&["players", "slots", "spots"]).or_else(|| text_slots(&text)) {
        record.insert("availableSlots".into(), slots);
    }
    if let Some(holes) = data(&["holes"]).or_else(|| text_holes(&text)) {
        record.insert("holes".into(), holes);
    }
    if let Some(flag) = data(&["hot-deal", "deal"]) {
        record.insert("isHotDeal".into(), flag);
    }

    record.insert("className".into(), Value::String(node.classes.join(" ")));
    record.insert("text".into(), Value::String(text));

    Value::Object(record)
}

// ============================================================================
// Field Lookup and Coercion
// ============================================================================

/// First present, non-null candidate
fn pick<'a>(obj: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

fn coerce_time(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = normalize_whitespace(s);
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}

/// Parse a price from a JSON number or the first numeric token of a string
pub fn coerce_price(value: &Value) -> Option<f64> {
    static NUMERIC_TOKEN: OnceLock<Regex> = OnceLock::new();

    match value {
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite() && *p >= 0.0),
        Value::String(s) => {
            let re = NUMERIC_TOKEN.get_or_init(|| {
                Regex::new(r"\d[\d,]*(?:\.\d+)?|\.\d+").expect("Invalid regex pattern")
            });
            let token = re.find(s)?.as_str();
            let cleaned: String = token
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
        }
        _ => None,
    }
}

/// Parse a non-negative integer from a JSON number or string
pub fn coerce_count(value: &Value) -> Option<u32> {
    static INTEGER_TOKEN: OnceLock<Regex> = OnceLock::new();

    match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => u32::try_from(v).ok(),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u32),
        },
        Value::String(s) => {
            let re =
                INTEGER_TOKEN.get_or_init(|| Regex::new(r"-?\d+").expect("Invalid regex pattern"));
            re.find(s)?.as_str().parse::<u32>().ok()
        }
        _ => None,
    }
}

/// 9-hole times stay 9; every other count is an 18-hole round
fn coerce_holes(count: u32) -> u8 {
    if count == 9 {
        9
    } else {
        TeeTimeSlot::DEFAULT_HOLES
    }
}

fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn mentions_hot_deal(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            let lower = s.to_ascii_lowercase();
            HOT_DEAL_KEYWORDS.iter().any(|k| lower.contains(k))
        }
        Value::Array(items) => items.iter().any(mentions_hot_deal),
        _ => false,
    }
}

// ============================================================================
// Text Extraction (rendered pages)
// ============================================================================

fn text_time(text: &str) -> Option<Value> {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    let re = TIME_RE.get_or_init(|| {
        Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s*[ap]\.?m\.?)?").expect("Invalid regex pattern")
    });
    re.find(text).map(|m| Value::String(m.as_str().to_string()))
}

fn text_price(text: &str) -> Option<Value> {
    static PRICE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PRICE_RE.get_or_init(|| {
        Regex::new(r"[$€£]\s*\d[\d,]*(?:\.\d{1,2})?").expect("Invalid regex pattern")
    });
    re.find(text).map(|m| Value::String(m.as_str().to_string()))
}

fn text_slots(text: &str) -> Option<Value> {
    static SLOTS_RE: OnceLock<Regex> = OnceLock::new();
    let re = SLOTS_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\d+\s*-\s*)?(\d+)\s*(?:players?|spots?|golfers?|slots?|open)\b")
            .expect("Invalid regex pattern")
    });
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| Value::String(m.as_str().to_string()))
}

fn text_holes(text: &str) -> Option<Value> {
    static HOLES_RE: OnceLock<Regex> = OnceLock::new();
    let re = HOLES_RE
        .get_or_init(|| Regex::new(r"(?i)\b(9|18)\s*holes?\b").expect("Invalid regex pattern"));
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| Value::String(m.as_str().to_string()))
}
