//! services/api/src/web/settings.rs
//!
//! Axum handlers for per-user sleep settings (GET / PUT, auth required).
//! Range validation for hour/minute fields happens here at the boundary;
//! the core treats settings as an open mapping.

use crate::web::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sleep_coach_core::domain::{SleepSettings, TodayOverride};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Request/Response Structs
//=========================================================================================

/// A one-day bedtime/wake-up exception.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct TodayOverridePayload {
    /// The date the override applies to (YYYY-MM-DD).
    pub date: NaiveDate,
    pub sleep_hour: i32,
    pub sleep_minute: i32,
    pub wake_hour: i32,
    pub wake_minute: i32,
}

#[derive(Deserialize, ToSchema)]
#[serde(default)]
pub struct SettingsPutRequest {
    pub wake_up_hour: i32,
    pub wake_up_minute: i32,
    pub sleep_duration_hours: i32,
    pub resilience_window_minutes: i32,
    pub mission_enabled: bool,
    pub mission_target: Option<String>,
    pub preparation_minutes: i32,
    pub ics_url: Option<String>,
    pub today_override: Option<TodayOverridePayload>,
}

impl Default for SettingsPutRequest {
    fn default() -> Self {
        Self {
            wake_up_hour: 7,
            wake_up_minute: 0,
            sleep_duration_hours: 8,
            resilience_window_minutes: 20,
            mission_enabled: false,
            mission_target: None,
            preparation_minutes: 30,
            ics_url: None,
            today_override: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SettingsResponse {
    pub wake_up_hour: i32,
    pub wake_up_minute: i32,
    pub sleep_duration_hours: i32,
    pub resilience_window_minutes: i32,
    pub mission_enabled: bool,
    pub mission_target: Option<String>,
    pub preparation_minutes: i32,
    pub ics_url: Option<String>,
    pub today_override: Option<TodayOverridePayload>,
}

impl SettingsResponse {
    fn from_domain(settings: SleepSettings) -> Self {
        Self {
            wake_up_hour: settings.wake_up_hour,
            wake_up_minute: settings.wake_up_minute,
            sleep_duration_hours: settings.sleep_duration_hours,
            resilience_window_minutes: settings.resilience_window_minutes,
            mission_enabled: settings.mission_enabled,
            mission_target: settings.mission_target,
            preparation_minutes: settings.preparation_minutes,
            ics_url: settings.ics_url,
            today_override: settings.today_override.map(|o| TodayOverridePayload {
                date: o.date,
                sleep_hour: o.sleep_hour,
                sleep_minute: o.sleep_minute,
                wake_hour: o.wake_hour,
                wake_minute: o.wake_minute,
            }),
        }
    }

    /// The response when the user has never saved settings.
    fn defaults() -> Self {
        let d = SettingsPutRequest::default();
        Self {
            wake_up_hour: d.wake_up_hour,
            wake_up_minute: d.wake_up_minute,
            sleep_duration_hours: d.sleep_duration_hours,
            resilience_window_minutes: d.resilience_window_minutes,
            mission_enabled: d.mission_enabled,
            mission_target: d.mission_target,
            preparation_minutes: d.preparation_minutes,
            ics_url: d.ics_url,
            today_override: None,
        }
    }
}

//=========================================================================================
// Boundary Validation
//=========================================================================================

fn in_range(name: &str, value: i32, min: i32, max: i32) -> Result<(), (StatusCode, String)> {
    if value < min || value > max {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("{} must be between {} and {}", name, min, max),
        ));
    }
    Ok(())
}

fn validate_put_request(req: &SettingsPutRequest) -> Result<(), (StatusCode, String)> {
    in_range("wake_up_hour", req.wake_up_hour, 0, 23)?;
    in_range("wake_up_minute", req.wake_up_minute, 0, 59)?;
    in_range("sleep_duration_hours", req.sleep_duration_hours, 1, 24)?;
    in_range("resilience_window_minutes", req.resilience_window_minutes, 0, 120)?;
    in_range("preparation_minutes", req.preparation_minutes, 0, 300)?;
    if let Some(o) = &req.today_override {
        in_range("today_override.sleep_hour", o.sleep_hour, 0, 23)?;
        in_range("today_override.sleep_minute", o.sleep_minute, 0, 59)?;
        in_range("today_override.wake_hour", o.wake_hour, 0, 23)?;
        in_range("today_override.wake_minute", o.wake_minute, 0, 59)?;
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Fetch the authenticated user's sleep settings, or defaults when unsaved.
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "The user's settings", body = SettingsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let settings = state
        .db
        .get_settings(user_id)
        .await
        .map_err(port_error_response)?;
    let response = match settings {
        Some(row) => SettingsResponse::from_domain(row),
        None => SettingsResponse::defaults(),
    };
    Ok(Json(response))
}

/// Save (upsert) the authenticated user's sleep settings.
///
/// A missing `today_override` clears any stored override.
#[utoipa::path(
    put,
    path = "/api/v1/settings",
    request_body = SettingsPutRequest,
    responses(
        (status = 200, description = "Saved settings", body = SettingsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 422, description = "A field is out of range"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn put_settings_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SettingsPutRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_put_request(&req)?;

    let settings = SleepSettings {
        user_id,
        wake_up_hour: req.wake_up_hour,
        wake_up_minute: req.wake_up_minute,
        sleep_duration_hours: req.sleep_duration_hours,
        resilience_window_minutes: req.resilience_window_minutes,
        mission_enabled: req.mission_enabled,
        mission_target: req.mission_target,
        preparation_minutes: req.preparation_minutes,
        ics_url: req.ics_url,
        today_override: req.today_override.map(|o| TodayOverride {
            date: o.date,
            sleep_hour: o.sleep_hour,
            sleep_minute: o.sleep_minute,
            wake_hour: o.wake_hour,
            wake_minute: o.wake_minute,
        }),
        // The adapter stamps the real value on write.
        updated_at: Utc::now(),
    };

    let saved = state
        .db
        .upsert_settings(user_id, settings)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SettingsResponse::from_domain(saved)))
}
