//! services/api/src/web/users.rs
//!
//! Axum handlers for user management (create, list, fetch, update, delete).

use crate::web::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// API Request/Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UserCreate {
    pub email: String,
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UserUpdate {
    pub name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<sleep_coach_core::domain::User> for UserResponse {
    fn from(user: sleep_coach_core::domain::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
}

#[derive(Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Number of users to skip (default 0).
    pub skip: Option<i64>,
    /// Page size (default 100).
    pub limit: Option<i64>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Create a new user.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UserCreate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .db
        .create_user(&req.email, &req.name)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// List users.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "List of users", body = UserListResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let users = state
        .db
        .get_all_users(query.skip.unwrap_or(0), query.limit.unwrap_or(100))
        .await
        .map_err(port_error_response)?;
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    let total = users.len();
    Ok(Json(UserListResponse { users, total }))
}

/// Fetch one user by id.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "The user's id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .db
        .get_user_by_id(user_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(UserResponse::from(user)))
}

/// Update a user's name.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "The user's id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UserUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = match req.name {
        Some(name) => state
            .db
            .update_user_name(user_id, &name)
            .await
            .map_err(port_error_response)?,
        // Nothing to change; echo the current row.
        None => state
            .db
            .get_user_by_id(user_id)
            .await
            .map_err(port_error_response)?,
    };
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user (cascades to logs, settings, and the plan cache).
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "The user's id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_user(user_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
