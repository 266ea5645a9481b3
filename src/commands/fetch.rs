use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};

use fairway::config::Config;
use fairway::context::Services;

/// Resolve one course and print its sheet as JSON
pub async fn fetch(config: Config, course_id: String, date: Option<String>, refresh: bool) -> Result<()> {
    let date = match date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))?,
        None => Local::now().date_naive(),
    };

    let services = Services::init(&config)
        .await
        .context("Failed to initialize services")?;

    let Some(course) = services.registry.get(&course_id).cloned() else {
        services.shutdown().await;
        bail!("Course not found: {course_id}");
    };

    tracing::info!(course_id = %course.id, date = %date, refresh, "Fetching tee times");

    let resolution = if refresh {
        services.dispatcher.refresh(&course, date).await
    } else {
        services.dispatcher.lookup(&course, date).await
    };

    services.shutdown().await;

    tracing::info!(
        origin = ?resolution.origin,
        slots = resolution.slots.len(),
        "Fetch complete"
    );

    let output = serde_json::json!({
        "course": course,
        "date": date,
        "teeTimes": resolution.slots,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
