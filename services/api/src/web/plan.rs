//! services/api/src/web/plan.rs
//!
//! Axum handler for the weekly plan endpoint (auth required). The heavy
//! lifting happens in `sleep_coach_core::plan`; this layer only decodes the
//! request, fills in the server-side date default, and shapes the response.

use crate::web::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sleep_coach_core::plan::PlanService;
use sleep_coach_core::ports::PortError;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Request/Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(default)]
pub struct PlanRequest {
    /// Calendar events; arbitrary extra fields are preserved.
    #[schema(value_type = Vec<Object>)]
    pub calendar_events: Vec<Value>,
    /// Recent sleep logs as the client sees them.
    #[schema(value_type = Vec<Object>)]
    pub sleep_logs: Vec<Value>,
    /// Open settings mapping; may embed a `today_override` entry.
    #[schema(value_type = Object)]
    pub settings: Map<String, Value>,
    /// Reference date (YYYY-MM-DD); defaults to the server's current UTC date.
    pub today_date: Option<String>,
    /// Skip the cache lookup and regenerate unconditionally.
    pub force: bool,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            calendar_events: Vec::new(),
            sleep_logs: Vec::new(),
            settings: Map::new(),
            today_date: None,
            force: false,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    /// Whether the plan came from the cache rather than a fresh generation.
    pub cache_hit: bool,
    /// The generated (or cached) weekly plan payload.
    #[schema(value_type = Object)]
    pub plan: Value,
}

//=========================================================================================
// Handler
//=========================================================================================

/// Fetch or generate the authenticated user's weekly sleep plan.
///
/// Identical inputs resolve to the cached plan; any material change (or
/// `force`) regenerates through the external LLM and replaces the user's
/// single cache row.
#[utoipa::path(
    post,
    path = "/api/v1/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "The weekly plan", body = PlanResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Plan generation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_or_create_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<PlanRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let today_date = req
        .today_date
        .unwrap_or_else(|| Utc::now().date_naive().to_string());

    let service = PlanService::new(state.plan_cache.clone(), state.plan_generator.clone());
    let result = service
        .get_or_create_plan(
            user_id,
            &req.calendar_events,
            &req.sleep_logs,
            &req.settings,
            Some(today_date.as_str()),
            req.force,
        )
        .await
        .map_err(|e| match e {
            PortError::Unexpected(msg) => {
                error!("Plan generation failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Plan generation failed".to_string(),
                )
            }
            other => port_error_response(other),
        })?;

    Ok(Json(PlanResponse {
        cache_hit: result.cache_hit,
        plan: result.plan,
    }))
}
