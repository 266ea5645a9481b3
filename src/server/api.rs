//! REST API handlers
//!
//! Upstream failures never surface here: the dispatcher degrades them to
//! empty sheets. Handlers only fail for unknown courses (404), invalid input
//! (400), or the metrics encoder (500).

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::FairwayErrorTrait;
use crate::metrics;
use crate::models::{Course, CourseSlots, SlotFilter, TeeTimeSlot};

use super::AppState;

/// Most course ids accepted by one batch request
pub const MAX_BATCH_COURSES: usize = 100;

// ============================================================================
// API Response Types
// ============================================================================

/// One course's resolved sheet
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeeTimesResponse {
    pub course: Course,
    pub date: NaiveDate,
    pub tee_times: Vec<TeeTimeSlot>,
}

/// Filters echoed back with search results
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub max_price: Option<f64>,
    pub min_slots: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub date: NaiveDate,
    pub filters: SearchFilters,
    pub results: Vec<CourseSlots>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub date: NaiveDate,
    pub results: Vec<CourseSlots>,
}

/// Body of `POST /tee-times/batch`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub course_ids: Vec<String>,
    pub date: Option<String>,
}

/// Body of `POST /refresh/{courseId}`; may be empty
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub date: Option<String>,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Failures a handler can report
#[derive(Debug)]
pub enum ApiError {
    /// Unknown course id
    CourseNotFound(String),
    /// One or more invalid inputs
    Validation(Vec<String>),
    /// Anything else
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::CourseNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: format!("Course not found: {id}"),
                    details: Vec::new(),
                },
            ),
            Self::Validation(details) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation failed".to_string(),
                    details,
                },
            ),
            Self::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal server error".to_string(),
                        details: Vec::new(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::Validation(details) => Self::Validation(details),
            other => {
                tracing::error!(
                    category = other.category().as_str(),
                    recoverable = other.is_recoverable(),
                    error = %other,
                    "Request failed"
                );
                Self::Internal(other.to_string())
            }
        }
    }
}

// ============================================================================
// Input Validation
// ============================================================================

/// `YYYY-MM-DD`, defaulting to today when absent
fn parse_date(raw: Option<&str>, errors: &mut Vec<String>) -> NaiveDate {
    let today = Local::now().date_naive();
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => today,
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| {
            errors.push(format!("date must be YYYY-MM-DD, got '{s}'"));
            today
        }),
    }
}

fn parse_max_price(raw: Option<&str>, errors: &mut Vec<String>) -> Option<f64> {
    let s = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            errors.push(format!("maxPrice must be a non-negative number, got '{s}'"));
            None
        }
    }
}

fn parse_min_slots(raw: Option<&str>, errors: &mut Vec<String>) -> u32 {
    let default = SlotFilter::default().min_slots;
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => s.parse::<u32>().unwrap_or_else(|_| {
            errors.push(format!("minSlots must be a non-negative integer, got '{s}'"));
            default
        }),
    }
}

fn finish<T>(value: T, errors: Vec<String>) -> Result<T, ApiError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn find_course(state: &AppState, id: &str) -> Result<Course, ApiError> {
    state
        .services
        .registry
        .get(id)
        .cloned()
        .ok_or_else(|| ApiError::CourseNotFound(id.to_string()))
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/{id}", get(get_course))
        .route("/tee-times/batch", post(batch_tee_times))
        .route("/tee-times/{course_id}", get(get_tee_times))
        .route("/search/tee-times", get(search_tee_times))
        .route("/refresh/{course_id}", post(refresh_tee_times))
        .route("/metrics", get(prometheus_metrics))
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_courses(State(state): State<AppState>) -> Json<Vec<Course>> {
    Json(state.services.registry.all().to_vec())
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, ApiError> {
    find_course(&state, &id).map(Json)
}

async fn get_tee_times(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<TeeTimesResponse>, ApiError> {
    let course = find_course(&state, &course_id)?;

    let mut errors = Vec::new();
    let date = parse_date(params.get("date").map(String::as_str), &mut errors);
    let date = finish(date, errors)?;

    let tee_times = state.services.dispatcher.resolve(&course, date).await;

    Ok(Json(TeeTimesResponse {
        course,
        date,
        tee_times,
    }))
}

async fn search_tee_times(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SearchResponse>, ApiError> {
    let get = |key: &str| params.get(key).map(String::as_str);

    let mut errors = Vec::new();
    let date = parse_date(get("date"), &mut errors);
    let max_price = parse_max_price(get("maxPrice"), &mut errors);
    let min_slots = parse_min_slots(get("minSlots"), &mut errors);
    let (date, filter) = finish((date, SlotFilter { max_price, min_slots }), errors)?;

    let city = get("city")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let registry = &state.services.registry;
    let requested: Option<Vec<String>> = get("courseIds").map(|ids| {
        ids.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    });

    let course_ids: Vec<String> = match (requested, &city) {
        (Some(ids), Some(city)) => ids
            .into_iter()
            .filter(|id| {
                registry
                    .get(id)
                    .map_or(true, |c| c.city.eq_ignore_ascii_case(city))
            })
            .collect(),
        (Some(ids), None) => ids,
        (None, Some(city)) => registry.in_city(city).iter().map(|c| c.id.clone()).collect(),
        (None, None) => registry.ids(),
    };

    let results = state
        .services
        .aggregator
        .search(&course_ids, date, filter)
        .await;

    Ok(Json(SearchResponse {
        date,
        filters: SearchFilters {
            max_price: filter.max_price,
            min_slots: filter.min_slots,
            city,
        },
        results,
    }))
}

async fn batch_tee_times(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BatchResponse>, ApiError> {
    let request: BatchRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(vec![format!("invalid request body: {e}")]))?;

    let mut errors = Vec::new();
    let date = parse_date(request.date.as_deref(), &mut errors);
    if request.course_ids.is_empty() {
        errors.push("courseIds must not be empty".to_string());
    }
    if request.course_ids.len() > MAX_BATCH_COURSES {
        errors.push(format!("courseIds accepts at most {MAX_BATCH_COURSES} ids"));
    }
    let date = finish(date, errors)?;

    let results = state
        .services
        .aggregator
        .batch(&request.course_ids, date)
        .await;

    Ok(Json(BatchResponse { date, results }))
}

async fn refresh_tee_times(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    body: Bytes,
) -> Result<Json<TeeTimesResponse>, ApiError> {
    let course = find_course(&state, &course_id)?;

    let request: RefreshRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Validation(vec![format!("invalid request body: {e}")]))?
    };

    let mut errors = Vec::new();
    let date = parse_date(request.date.as_deref(), &mut errors);
    let date = finish(date, errors)?;

    let resolution = state.services.dispatcher.refresh(&course, date).await;

    Ok(Json(TeeTimesResponse {
        course,
        date,
        tee_times: resolution.slots,
    }))
}

async fn prometheus_metrics() -> Result<Response, ApiError> {
    let body = metrics::encode_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
