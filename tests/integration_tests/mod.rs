//! End-to-end tests over the assembled service graph, with booking APIs
//! served by wiremock and the browser replaced by a canned renderer.

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
