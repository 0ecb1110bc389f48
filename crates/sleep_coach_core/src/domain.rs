//! crates/sleep_coach_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Represents a registered user of the coaching service.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One night's sleep log (one row per user per calendar date).
#[derive(Debug, Clone)]
pub struct SleepLog {
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

/// Field-level patch for a sleep log. `None` leaves the stored value as-is.
///
/// The doubly-wrapped options distinguish "not sent" from "set to null".
#[derive(Debug, Clone, Default)]
pub struct SleepLogPatch {
    pub date: Option<NaiveDate>,
    pub score: Option<i32>,
    pub scheduled_sleep_time: Option<Option<DateTime<Utc>>>,
    pub usage_penalty: Option<i32>,
    pub environment_penalty: Option<i32>,
    pub usage_minutes: Option<i32>,
    pub phase1_warning: Option<bool>,
    pub phase2_warning: Option<bool>,
    pub light_exceeded: Option<bool>,
    pub noise_exceeded: Option<bool>,
    pub mood: Option<Option<i32>>,
}

impl SleepLogPatch {
    /// True when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.score.is_none()
            && self.scheduled_sleep_time.is_none()
            && self.usage_penalty.is_none()
            && self.environment_penalty.is_none()
            && self.usage_minutes.is_none()
            && self.phase1_warning.is_none()
            && self.phase2_warning.is_none()
            && self.light_exceeded.is_none()
            && self.noise_exceeded.is_none()
            && self.mood.is_none()
    }
}

/// A one-day exception to the recurring sleep schedule.
///
/// Hour/minute ranges are enforced at the API boundary, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayOverride {
    pub date: NaiveDate,
    pub sleep_hour: i32,
    pub sleep_minute: i32,
    pub wake_hour: i32,
    pub wake_minute: i32,
}

/// Per-user sleep settings (one row per user).
#[derive(Debug, Clone)]
pub struct SleepSettings {
    pub user_id: Uuid,
    pub wake_up_hour: i32,
    pub wake_up_minute: i32,
    pub sleep_duration_hours: i32,
    pub resilience_window_minutes: i32,
    pub mission_enabled: bool,
    pub mission_target: Option<String>,
    pub preparation_minutes: i32,
    pub ics_url: Option<String>,
    pub today_override: Option<TodayOverride>,
    pub updated_at: DateTime<Utc>,
}

/// The single cached weekly plan row for a user.
///
/// `fingerprint` is the 64-hex-char signature the plan was generated for;
/// a new fingerprint for the same user replaces the row (upsert).
#[derive(Debug, Clone)]
pub struct CachedPlan {
    pub user_id: Uuid,
    pub fingerprint: String,
    pub plan: Value,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a plan request: the payload plus whether it came from cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    pub plan: Value,
    pub cache_hit: bool,
}
