//! Course registry
//!
//! The list of courses is an external input: a JSON array of course
//! objects, loaded once at startup and never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

use crate::models::Course;
use crate::utils::error::RegistryError;

/// Immutable, ordered set of known courses
#[derive(Debug, Clone, Default)]
pub struct CourseRegistry {
    courses: Vec<Course>,
    by_id: HashMap<String, usize>,
}

impl CourseRegistry {
    /// Build from a course list, rejecting duplicate ids
    pub fn new(courses: Vec<Course>) -> Result<Self, RegistryError> {
        let mut by_id = HashMap::with_capacity(courses.len());
        for (idx, course) in courses.iter().enumerate() {
            if by_id.insert(course.id.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateId(course.id.clone()));
            }
        }
        Ok(Self { courses, by_id })
    }

    /// Parse a JSON course list
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let courses: Vec<Course> = serde_json::from_str(json)?;
        Self::new(courses)
    }

    /// Load a JSON course list from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RegistryError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let registry = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), courses = registry.len(), "Loaded course registry");
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Course> {
        self.by_id.get(id).map(|idx| &self.courses[*idx])
    }

    /// Every course, in registry order
    pub fn all(&self) -> &[Course] {
        &self.courses
    }

    pub fn ids(&self) -> Vec<String> {
        self.courses.iter().map(|c| c.id.clone()).collect()
    }

    /// Courses in a city, compared case-insensitively
    pub fn in_city(&self, city: &str) -> Vec<&Course> {
        let city = city.trim();
        self.courses
            .iter()
            .filter(|c| c.city.eq_ignore_ascii_case(city))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}
