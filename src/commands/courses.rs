use anyhow::{Context, Result};

use fairway::config::Config;
use fairway::registry::CourseRegistry;

/// List the course registry
pub async fn courses(config: Config, city: Option<String>) -> Result<()> {
    let registry = CourseRegistry::load(&config.registry.path)
        .await
        .with_context(|| format!("Failed to load {}", config.registry.path.display()))?;

    let courses = match city.as_deref() {
        Some(city) => registry.in_city(city),
        None => registry.all().iter().collect(),
    };

    println!("{:<24} {:<16} {:<14} NAME", "ID", "CITY", "SYSTEM");
    for course in &courses {
        println!(
            "{:<24} {:<16} {:<14} {}",
            course.id,
            course.city,
            course.booking_system.as_str(),
            course.name
        );
    }
    println!("\n{} course(s)", courses.len());

    Ok(())
}
