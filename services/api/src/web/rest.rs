//! services/api/src/web/rest.rs
//!
//! Contains the health-check handlers and the master definition for the
//! OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        db_health_handler,
        crate::web::users::create_user_handler,
        crate::web::users::list_users_handler,
        crate::web::users::get_user_handler,
        crate::web::users::update_user_handler,
        crate::web::users::delete_user_handler,
        crate::web::settings::get_settings_handler,
        crate::web::settings::put_settings_handler,
        crate::web::sleep_logs::list_sleep_logs_handler,
        crate::web::sleep_logs::create_sleep_log_handler,
        crate::web::sleep_logs::update_sleep_log_handler,
        crate::web::plan::get_or_create_plan_handler,
    ),
    components(
        schemas(
            crate::web::users::UserCreate,
            crate::web::users::UserUpdate,
            crate::web::users::UserResponse,
            crate::web::users::UserListResponse,
            crate::web::settings::TodayOverridePayload,
            crate::web::settings::SettingsPutRequest,
            crate::web::settings::SettingsResponse,
            crate::web::sleep_logs::SleepLogCreate,
            crate::web::sleep_logs::SleepLogUpdate,
            crate::web::sleep_logs::SleepLogResponse,
            crate::web::sleep_logs::SleepLogListResponse,
            crate::web::plan::PlanRequest,
            crate::web::plan::PlanResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Sleep Coach API", description = "API endpoints for the sleep-coaching backend.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer-token security scheme referenced by the protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Health Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Database connectivity probe.
#[utoipa::path(
    get,
    path = "/api/v1/health/db",
    responses((status = 200, description = "Database connectivity status"))
)]
pub async fn db_health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => Json(json!({ "status": "healthy", "database": "connected" })),
        Err(e) => Json(json!({
            "status": "unhealthy",
            "database": "disconnected",
            "error": e.to_string(),
        })),
    }
}
