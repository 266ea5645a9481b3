//! Multi-course fan-out for search and batch lookups
//!
//! Every course is resolved in its own task. A course whose fetch times out
//! or whose task panics contributes an empty sheet and never delays or fails
//! its siblings. Upstream concurrency and the per-fetch budget both live in
//! the dispatcher, so a course waiting for a permit is not on the clock.

use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::models::{Course, CourseSlots, SlotFilter, TeeTimeSlot};
use crate::registry::CourseRegistry;

/// Concurrent multi-course resolver
pub struct Aggregator {
    dispatcher: Arc<Dispatcher>,
    registry: Arc<CourseRegistry>,
}

impl Aggregator {
    pub fn new(dispatcher: Arc<Dispatcher>, registry: Arc<CourseRegistry>) -> Self {
        Self { dispatcher, registry }
    }

    /// Filtered availability; courses with nothing left are dropped.
    /// Input order is preserved among the survivors.
    pub async fn search(
        &self,
        course_ids: &[String],
        date: NaiveDate,
        filter: SlotFilter,
    ) -> Vec<CourseSlots> {
        let resolved = self.fan_out(course_ids, date).await;
        let total = resolved.len();

        let results: Vec<CourseSlots> = resolved
            .into_iter()
            .filter_map(|(course, slots)| {
                let tee_times = filter.apply(&slots);
                (!tee_times.is_empty()).then_some(CourseSlots { course, tee_times })
            })
            .collect();

        tracing::info!(
            date = %date,
            courses = total,
            matched = results.len(),
            max_price = ?filter.max_price,
            min_slots = filter.min_slots,
            "Search completed"
        );

        results
    }

    /// Unfiltered availability for every known course, empty ones included
    pub async fn batch(&self, course_ids: &[String], date: NaiveDate) -> Vec<CourseSlots> {
        self.fan_out(course_ids, date)
            .await
            .into_iter()
            .map(|(course, tee_times)| CourseSlots { course, tee_times })
            .collect()
    }

    async fn fan_out(&self, course_ids: &[String], date: NaiveDate) -> Vec<(Course, Vec<TeeTimeSlot>)> {
        let courses: Vec<Course> = course_ids
            .iter()
            .filter_map(|id| {
                let course = self.registry.get(id).cloned();
                if course.is_none() {
                    tracing::warn!(course_id = %id, "Skipping unknown course");
                }
                course
            })
            .collect();

        let tasks = courses.iter().cloned().map(|course| {
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move { dispatcher.resolve(&course, date).await })
        });

        let results = join_all(tasks).await;

        courses
            .into_iter()
            .zip(results)
            .map(|(course, result)| {
                let slots = result.unwrap_or_else(|e| {
                    tracing::error!(course_id = %course.id, error = %e, "Course task failed");
                    Vec::new()
                });
                (course, slots)
            })
            .collect()
    }
}
