pub mod middleware;
pub mod plan;
pub mod rest;
pub mod settings;
pub mod sleep_logs;
pub mod state;
pub mod users;

pub use middleware::require_auth;
pub use rest::ApiDoc;

use axum::http::StatusCode;
use sleep_coach_core::ports::PortError;

/// Maps a port error onto the HTTP status and message handlers respond with.
pub(crate) fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            tracing::error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}
