//! services/api/src/web/sleep_logs.rs
//!
//! Axum handlers for daily sleep logs (list, create, partial update;
//! auth required). One log per user per calendar date.

use crate::web::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sleep_coach_core::domain::{SleepLog, SleepLogPatch};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// API Request/Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SleepLogCreate {
    /// The calendar date the log belongs to (YYYY-MM-DD).
    pub date: NaiveDate,
    /// Sleep score, 0-100.
    pub score: i32,
    pub scheduled_sleep_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_penalty: i32,
    #[serde(default)]
    pub environment_penalty: i32,
    #[serde(default)]
    pub usage_minutes: i32,
    #[serde(default)]
    pub phase1_warning: bool,
    #[serde(default)]
    pub phase2_warning: bool,
    #[serde(default)]
    pub light_exceeded: bool,
    #[serde(default)]
    pub noise_exceeded: bool,
    /// Mood, 1-5.
    pub mood: Option<i32>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct SleepLogUpdate {
    pub date: Option<NaiveDate>,
    pub score: Option<i32>,
    pub scheduled_sleep_time: Option<DateTime<Utc>>,
    pub usage_penalty: Option<i32>,
    pub environment_penalty: Option<i32>,
    pub usage_minutes: Option<i32>,
    pub phase1_warning: Option<bool>,
    pub phase2_warning: Option<bool>,
    pub light_exceeded: Option<bool>,
    pub noise_exceeded: Option<bool>,
    pub mood: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct SleepLogResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub score: i32,
    pub scheduled_sleep_time: Option<DateTime<Utc>>,
    pub usage_penalty: i32,
    pub environment_penalty: i32,
    pub usage_minutes: i32,
    pub phase1_warning: bool,
    pub phase2_warning: bool,
    pub light_exceeded: bool,
    pub noise_exceeded: bool,
    pub mood: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<SleepLog> for SleepLogResponse {
    fn from(log: SleepLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            date: log.date,
            score: log.score,
            scheduled_sleep_time: log.scheduled_sleep_time,
            usage_penalty: log.usage_penalty,
            environment_penalty: log.environment_penalty,
            usage_minutes: log.usage_minutes,
            phase1_warning: log.phase1_warning,
            phase2_warning: log.phase2_warning,
            light_exceeded: log.light_exceeded,
            noise_exceeded: log.noise_exceeded,
            mood: log.mood,
            created_at: log.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SleepLogListResponse {
    pub logs: Vec<SleepLogResponse>,
    pub total: usize,
}

#[derive(Deserialize, IntoParams)]
pub struct ListSleepLogsQuery {
    /// Number of logs to return, newest date first (1-100, default 7).
    pub limit: Option<i64>,
}

//=========================================================================================
// Boundary Validation
//=========================================================================================

fn validate_score(score: i32) -> Result<(), (StatusCode, String)> {
    if !(0..=100).contains(&score) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "score must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

fn validate_mood(mood: i32) -> Result<(), (StatusCode, String)> {
    if !(1..=5).contains(&mood) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "mood must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the authenticated user's sleep logs, newest date first.
#[utoipa::path(
    get,
    path = "/api/v1/sleep-logs",
    params(ListSleepLogsQuery),
    responses(
        (status = 200, description = "The user's sleep logs", body = SleepLogListResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 422, description = "Invalid limit"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_sleep_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListSleepLogsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(7);
    if !(1..=100).contains(&limit) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "limit must be between 1 and 100".to_string(),
        ));
    }

    let logs = state
        .db
        .get_sleep_logs(user_id, limit)
        .await
        .map_err(port_error_response)?;
    let logs: Vec<SleepLogResponse> = logs.into_iter().map(SleepLogResponse::from).collect();
    let total = logs.len();
    Ok(Json(SleepLogListResponse { logs, total }))
}

/// Create a sleep log for the authenticated user.
#[utoipa::path(
    post,
    path = "/api/v1/sleep-logs",
    request_body = SleepLogCreate,
    responses(
        (status = 201, description = "Sleep log created", body = SleepLogResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "A log already exists for this date"),
        (status = 422, description = "A field is out of range"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_sleep_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SleepLogCreate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_score(req.score)?;
    if let Some(mood) = req.mood {
        validate_mood(mood)?;
    }

    if let Some(existing) = state
        .db
        .get_sleep_log_by_date(user_id, req.date)
        .await
        .map_err(port_error_response)?
    {
        return Err((
            StatusCode::CONFLICT,
            format!("Sleep log already exists for date {}", existing.date),
        ));
    }

    let log = SleepLog {
        id: Uuid::new_v4(),
        user_id,
        date: req.date,
        score: req.score,
        scheduled_sleep_time: req.scheduled_sleep_time,
        usage_penalty: req.usage_penalty,
        environment_penalty: req.environment_penalty,
        usage_minutes: req.usage_minutes,
        phase1_warning: req.phase1_warning,
        phase2_warning: req.phase2_warning,
        light_exceeded: req.light_exceeded,
        noise_exceeded: req.noise_exceeded,
        mood: req.mood,
        // The database stamps the real value on insert.
        created_at: Utc::now(),
    };

    let created = state
        .db
        .create_sleep_log(log)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(SleepLogResponse::from(created))))
}

/// Partially update one of the authenticated user's sleep logs.
#[utoipa::path(
    patch,
    path = "/api/v1/sleep-logs/{log_id}",
    params(("log_id" = Uuid, Path, description = "The sleep log's id")),
    request_body = SleepLogUpdate,
    responses(
        (status = 200, description = "Updated sleep log", body = SleepLogResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Sleep log not found"),
        (status = 409, description = "A log already exists for the new date"),
        (status = 422, description = "Empty body or a field out of range"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn update_sleep_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(log_id): Path<Uuid>,
    Json(req): Json<SleepLogUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Some(score) = req.score {
        validate_score(score)?;
    }
    if let Some(mood) = req.mood {
        validate_mood(mood)?;
    }

    let patch = SleepLogPatch {
        date: req.date,
        score: req.score,
        scheduled_sleep_time: req.scheduled_sleep_time.map(Some),
        usage_penalty: req.usage_penalty,
        environment_penalty: req.environment_penalty,
        usage_minutes: req.usage_minutes,
        phase1_warning: req.phase1_warning,
        phase2_warning: req.phase2_warning,
        light_exceeded: req.light_exceeded,
        noise_exceeded: req.noise_exceeded,
        mood: req.mood.map(Some),
    };
    if patch.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "At least one field required".to_string(),
        ));
    }

    // Moving the log onto a date that already has one is a conflict.
    if let Some(new_date) = patch.date {
        if let Some(other) = state
            .db
            .get_sleep_log_by_date(user_id, new_date)
            .await
            .map_err(port_error_response)?
        {
            if other.id != log_id {
                return Err((
                    StatusCode::CONFLICT,
                    format!("Sleep log already exists for date {}", new_date),
                ));
            }
        }
    }

    let updated = state
        .db
        .update_sleep_log(log_id, user_id, patch)
        .await
        .map_err(port_error_response)?
        .ok_or((
            StatusCode::NOT_FOUND,
            "Sleep log not found".to_string(),
        ))?;
    Ok(Json(SleepLogResponse::from(updated)))
}
