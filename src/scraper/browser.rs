//! Strategy for booking pages that only render availability client-side
//!
//! Booking widgets differ in markup, so several selectors are considered
//! equivalent. They are tried in order and the first one that matches any
//! element wins; its matches become [`RawNode`]s for the normalizer.

use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::{RawPayload, ScrapeStrategy};
use crate::models::Course;
use crate::normalizer::RawNode;
use crate::renderer::PageRenderer;
use crate::utils::error::ScrapeError;

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    /// Slot containers seen across booking widgets, most specific first
    static ref SLOT_SELECTORS: Vec<Selector> = vec![
        parse_selector!("[data-tee-time]"),
        parse_selector!(".tee-time-slot"),
        parse_selector!(".tee-time"),
        parse_selector!(".teetime"),
        parse_selector!(".time-slot"),
        parse_selector!("[class*='TeeTime']"),
        parse_selector!("li.booking-slot"),
    ];
}

/// Scrapes a JavaScript-rendered booking page
pub struct BrowserRenderedStrategy {
    renderer: Arc<dyn PageRenderer>,
    settle: Duration,
}

impl BrowserRenderedStrategy {
    pub fn new(renderer: Arc<dyn PageRenderer>, settle: Duration) -> Self {
        Self { renderer, settle }
    }

    /// Booking page URL for a date. `{date}` in the locator is substituted,
    /// otherwise a `date` query parameter is appended.
    pub fn page_url(locator: &str, date: NaiveDate) -> Result<String, ScrapeError> {
        let date = date.format("%Y-%m-%d").to_string();

        if locator.contains("{date}") {
            return Ok(locator.replace("{date}", &date));
        }

        let mut url = url::Url::parse(locator)
            .map_err(|_| ScrapeError::locator(locator, "an absolute booking page URL"))?;
        if !matches!(url.scheme(), "http" | "https" | "file") {
            return Err(ScrapeError::locator(locator, "an http(s) booking page URL"));
        }
        url.query_pairs_mut().append_pair("date", &date);
        Ok(url.to_string())
    }
}

/// Extract slot-like nodes using the first selector that matches
pub fn extract_slot_nodes(html: &str) -> Vec<RawNode> {
    let document = Html::parse_document(html);

    for selector in SLOT_SELECTORS.iter() {
        let nodes: Vec<RawNode> = document.select(selector).map(to_raw_node).collect();
        if !nodes.is_empty() {
            return nodes;
        }
    }

    Vec::new()
}

fn to_raw_node(element: ElementRef<'_>) -> RawNode {
    let value = element.value();

    let data: BTreeMap<String, String> = value
        .attrs()
        .filter_map(|(name, v)| {
            name.strip_prefix("data-")
                .map(|key| (key.to_string(), v.trim().to_string()))
        })
        .filter(|(_, v)| !v.is_empty())
        .collect();

    RawNode {
        text: element.text().collect::<Vec<_>>().join(" "),
        classes: value.classes().map(str::to_string).collect(),
        data,
    }
}

#[async_trait]
impl ScrapeStrategy for BrowserRenderedStrategy {
    fn name(&self) -> &'static str {
        "browser_rendered"
    }

    async fn fetch_raw(&self, course: &Course, date: NaiveDate) -> Result<RawPayload, ScrapeError> {
        let url = Self::page_url(&course.source_locator, date)?;
        let page = self.renderer.render(&url, self.settle).await?;

        let nodes = extract_slot_nodes(&page.html);
        tracing::debug!(
            course_id = %course.id,
            url = %url,
            nodes = nodes.len(),
            "Extracted slot nodes from rendered page"
        );

        if nodes.is_empty() {
            return Ok(RawPayload::Empty);
        }
        Ok(RawPayload::Dom(nodes))
    }
}
