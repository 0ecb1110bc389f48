//! crates/sleep_coach_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{CachedPlan, SleepLog, SleepLogPatch, SleepSettings, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> PortResult<()>;

    // --- User Management ---
    async fn create_user(&self, email: &str, name: &str) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_all_users(&self, skip: i64, limit: i64) -> PortResult<Vec<User>>;

    async fn update_user_name(&self, user_id: Uuid, name: &str) -> PortResult<User>;

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Sleep Log Management ---
    async fn get_sleep_logs(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<SleepLog>>;

    async fn get_sleep_log_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<SleepLog>>;

    async fn create_sleep_log(&self, log: SleepLog) -> PortResult<SleepLog>;

    async fn update_sleep_log(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        patch: SleepLogPatch,
    ) -> PortResult<Option<SleepLog>>;

    // --- Settings Management ---
    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<SleepSettings>>;

    async fn upsert_settings(
        &self,
        user_id: Uuid,
        settings: SleepSettings,
    ) -> PortResult<SleepSettings>;
}

/// Storage port for the single cached weekly plan row per user.
#[async_trait]
pub trait PlanCacheService: Send + Sync {
    /// Fetches the cached plan only if it matches the given fingerprint.
    async fn get_by_user_and_fingerprint(
        &self,
        user_id: Uuid,
        fingerprint: &str,
    ) -> PortResult<Option<CachedPlan>>;

    /// Fetches whatever plan row exists for the user, regardless of fingerprint.
    async fn get_by_user(&self, user_id: Uuid) -> PortResult<Option<CachedPlan>>;

    /// Replaces the user's single plan row (insert when absent).
    async fn upsert(&self, user_id: Uuid, fingerprint: &str, plan: &Value) -> PortResult<()>;
}

/// External weekly-plan generator (an LLM behind an HTTP API in production).
#[async_trait]
pub trait PlanGenerationService: Send + Sync {
    async fn generate_week_plan(
        &self,
        calendar_events: &[Value],
        sleep_logs: &[Value],
        settings: &Map<String, Value>,
        today_date: &str,
    ) -> PortResult<Value>;
}

/// Verifies an access token with the external auth provider and returns
/// the authenticated user's id.
#[async_trait]
pub trait TokenVerificationService: Send + Sync {
    async fn verify_token(&self, access_token: &str) -> PortResult<Uuid>;
}
