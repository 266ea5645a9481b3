//! Upstream payloads shared by the integration tests

use serde_json::{json, Value};

/// Facility API response: bare array, mixed field names
pub fn facility_api_body() -> Value {
    json!([
        {"teeTime": "7:00 AM", "greenFee": "$45.00", "availableSpots": 4},
        {"teeTime": "7:10 AM", "greenFee": 39.5, "availableSpots": "2", "tags": ["Hot Deal"]},
        {"teeTime": null, "greenFee": 10}
    ])
}

/// Club API response: enveloped
pub fn club_api_body() -> Value {
    json!({
        "teeTimes": [
            {"time": "8:00 AM", "price": 52, "players": 3},
            {"time": "8:20 AM", "price": null, "players": 4, "holes": 9}
        ]
    })
}

/// Rendered booking page
pub const RENDERED_SHEET: &str = r#"<!DOCTYPE html>
<html><body>
<div id="sheet">
  <div class="tee-time" data-time="6:40 AM" data-price="30">6:40 AM</div>
  <div class="tee-time promo">
    <span>11:20 AM</span> <span>$25</span> <span>4 spots</span> <em>Hot Deal</em>
  </div>
</div>
</body></html>"#;
