//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `PlanCacheService` ports from the `core` crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sleep_coach_core::domain::{
    CachedPlan, SleepLog, SleepLogPatch, SleepSettings, TodayOverride, User,
};
use sleep_coach_core::ports::{DatabaseService, PlanCacheService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` and
/// `PlanCacheService` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a constraint violation on insert/update to a `Conflict`, everything
/// else to `Unexpected`.
fn conflict_or_unexpected(e: sqlx::Error, conflict_msg: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            PortError::Conflict(conflict_msg.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SleepLogRecord {
    id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    score: i32,
    scheduled_sleep_time: Option<DateTime<Utc>>,
    usage_penalty: i32,
    environment_penalty: i32,
    usage_minutes: i32,
    phase1_warning: bool,
    phase2_warning: bool,
    light_exceeded: bool,
    noise_exceeded: bool,
    mood: Option<i32>,
    created_at: DateTime<Utc>,
}
impl SleepLogRecord {
    fn to_domain(self) -> SleepLog {
        SleepLog {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            score: self.score,
            scheduled_sleep_time: self.scheduled_sleep_time,
            usage_penalty: self.usage_penalty,
            environment_penalty: self.environment_penalty,
            usage_minutes: self.usage_minutes,
            phase1_warning: self.phase1_warning,
            phase2_warning: self.phase2_warning,
            light_exceeded: self.light_exceeded,
            noise_exceeded: self.noise_exceeded,
            mood: self.mood,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SleepSettingsRecord {
    user_id: Uuid,
    wake_up_hour: i32,
    wake_up_minute: i32,
    sleep_duration_hours: i32,
    resilience_window_minutes: i32,
    mission_enabled: bool,
    mission_target: Option<String>,
    preparation_minutes: i32,
    ics_url: Option<String>,
    override_date: Option<NaiveDate>,
    override_sleep_hour: Option<i32>,
    override_sleep_minute: Option<i32>,
    override_wake_hour: Option<i32>,
    override_wake_minute: Option<i32>,
    updated_at: DateTime<Utc>,
}
impl SleepSettingsRecord {
    fn to_domain(self) -> SleepSettings {
        // The override only exists when its date and both hour columns are set;
        // missing minutes read as 0.
        let today_override = match (
            self.override_date,
            self.override_sleep_hour,
            self.override_wake_hour,
        ) {
            (Some(date), Some(sleep_hour), Some(wake_hour)) => Some(TodayOverride {
                date,
                sleep_hour,
                sleep_minute: self.override_sleep_minute.unwrap_or(0),
                wake_hour,
                wake_minute: self.override_wake_minute.unwrap_or(0),
            }),
            _ => None,
        };
        SleepSettings {
            user_id: self.user_id,
            wake_up_hour: self.wake_up_hour,
            wake_up_minute: self.wake_up_minute,
            sleep_duration_hours: self.sleep_duration_hours,
            resilience_window_minutes: self.resilience_window_minutes,
            mission_enabled: self.mission_enabled,
            mission_target: self.mission_target,
            preparation_minutes: self.preparation_minutes,
            ics_url: self.ics_url,
            today_override,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CachedPlanRecord {
    user_id: Uuid,
    signature_hash: String,
    plan_json: String,
    created_at: DateTime<Utc>,
}
impl CachedPlanRecord {
    fn to_domain(self) -> PortResult<CachedPlan> {
        let plan: Value = serde_json::from_str(&self.plan_json).map_err(|e| {
            PortError::Unexpected(format!(
                "Stored plan for user {} is not valid JSON: {}",
                self.user_id, e
            ))
        })?;
        Ok(CachedPlan {
            user_id: self.user_id,
            // CHAR(64) columns come back space-padded when shorter; the hash
            // never is, but trim keeps the comparison honest.
            fingerprint: self.signature_hash.trim_end().to_string(),
            plan,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

const SLEEP_LOG_COLUMNS: &str = "id, user_id, date, score, scheduled_sleep_time, usage_penalty, \
     environment_penalty, usage_minutes, phase1_warning, phase2_warning, light_exceeded, \
     noise_exceeded, mood, created_at";

const SETTINGS_COLUMNS: &str = "user_id, wake_up_hour, wake_up_minute, sleep_duration_hours, \
     resilience_window_minutes, mission_enabled, mission_target, preparation_minutes, ics_url, \
     override_date, override_sleep_hour, override_sleep_minute, override_wake_hour, \
     override_wake_minute, updated_at";

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn create_user(&self, email: &str, name: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "A user with this email already exists"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn get_all_users(&self, skip: i64, limit: i64) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_user_name(&self, user_id: Uuid, name: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = $1, updated_at = now() WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn get_sleep_logs(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<SleepLog>> {
        let records = sqlx::query_as::<_, SleepLogRecord>(&format!(
            "SELECT {SLEEP_LOG_COLUMNS} FROM sleep_logs WHERE user_id = $1 ORDER BY date DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_sleep_log_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<SleepLog>> {
        let record = sqlx::query_as::<_, SleepLogRecord>(&format!(
            "SELECT {SLEEP_LOG_COLUMNS} FROM sleep_logs WHERE user_id = $1 AND date = $2"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn create_sleep_log(&self, log: SleepLog) -> PortResult<SleepLog> {
        let record = sqlx::query_as::<_, SleepLogRecord>(&format!(
            "INSERT INTO sleep_logs (id, user_id, date, score, scheduled_sleep_time, \
             usage_penalty, environment_penalty, usage_minutes, phase1_warning, phase2_warning, \
             light_exceeded, noise_exceeded, mood) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {SLEEP_LOG_COLUMNS}"
        ))
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.date)
        .bind(log.score)
        .bind(log.scheduled_sleep_time)
        .bind(log.usage_penalty)
        .bind(log.environment_penalty)
        .bind(log.usage_minutes)
        .bind(log.phase1_warning)
        .bind(log.phase2_warning)
        .bind(log.light_exceeded)
        .bind(log.noise_exceeded)
        .bind(log.mood)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "A sleep log already exists for this date"))?;
        Ok(record.to_domain())
    }

    async fn update_sleep_log(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        patch: SleepLogPatch,
    ) -> PortResult<Option<SleepLog>> {
        let existing = sqlx::query_as::<_, SleepLogRecord>(&format!(
            "SELECT {SLEEP_LOG_COLUMNS} FROM sleep_logs WHERE id = $1 AND user_id = $2"
        ))
        .bind(log_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let Some(existing) = existing.map(|r| r.to_domain()) else {
            return Ok(None);
        };

        let merged = SleepLog {
            date: patch.date.unwrap_or(existing.date),
            score: patch.score.unwrap_or(existing.score),
            scheduled_sleep_time: patch
                .scheduled_sleep_time
                .unwrap_or(existing.scheduled_sleep_time),
            usage_penalty: patch.usage_penalty.unwrap_or(existing.usage_penalty),
            environment_penalty: patch
                .environment_penalty
                .unwrap_or(existing.environment_penalty),
            usage_minutes: patch.usage_minutes.unwrap_or(existing.usage_minutes),
            phase1_warning: patch.phase1_warning.unwrap_or(existing.phase1_warning),
            phase2_warning: patch.phase2_warning.unwrap_or(existing.phase2_warning),
            light_exceeded: patch.light_exceeded.unwrap_or(existing.light_exceeded),
            noise_exceeded: patch.noise_exceeded.unwrap_or(existing.noise_exceeded),
            mood: patch.mood.unwrap_or(existing.mood),
            ..existing
        };

        let record = sqlx::query_as::<_, SleepLogRecord>(&format!(
            "UPDATE sleep_logs SET date = $1, score = $2, scheduled_sleep_time = $3, \
             usage_penalty = $4, environment_penalty = $5, usage_minutes = $6, \
             phase1_warning = $7, phase2_warning = $8, light_exceeded = $9, \
             noise_exceeded = $10, mood = $11 \
             WHERE id = $12 AND user_id = $13 RETURNING {SLEEP_LOG_COLUMNS}"
        ))
        .bind(merged.date)
        .bind(merged.score)
        .bind(merged.scheduled_sleep_time)
        .bind(merged.usage_penalty)
        .bind(merged.environment_penalty)
        .bind(merged.usage_minutes)
        .bind(merged.phase1_warning)
        .bind(merged.phase2_warning)
        .bind(merged.light_exceeded)
        .bind(merged.noise_exceeded)
        .bind(merged.mood)
        .bind(log_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "A sleep log already exists for this date"))?;
        Ok(Some(record.to_domain()))
    }

    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<SleepSettings>> {
        let record = sqlx::query_as::<_, SleepSettingsRecord>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM sleep_settings WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn upsert_settings(
        &self,
        user_id: Uuid,
        settings: SleepSettings,
    ) -> PortResult<SleepSettings> {
        let (override_date, override_sleep_hour, override_sleep_minute, override_wake_hour, override_wake_minute) =
            match &settings.today_override {
                Some(o) => (
                    Some(o.date),
                    Some(o.sleep_hour),
                    Some(o.sleep_minute),
                    Some(o.wake_hour),
                    Some(o.wake_minute),
                ),
                None => (None, None, None, None, None),
            };

        let record = sqlx::query_as::<_, SleepSettingsRecord>(&format!(
            "INSERT INTO sleep_settings (user_id, wake_up_hour, wake_up_minute, \
             sleep_duration_hours, resilience_window_minutes, mission_enabled, mission_target, \
             preparation_minutes, ics_url, override_date, override_sleep_hour, \
             override_sleep_minute, override_wake_hour, override_wake_minute, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now()) \
             ON CONFLICT (user_id) DO UPDATE SET \
             wake_up_hour = EXCLUDED.wake_up_hour, wake_up_minute = EXCLUDED.wake_up_minute, \
             sleep_duration_hours = EXCLUDED.sleep_duration_hours, \
             resilience_window_minutes = EXCLUDED.resilience_window_minutes, \
             mission_enabled = EXCLUDED.mission_enabled, mission_target = EXCLUDED.mission_target, \
             preparation_minutes = EXCLUDED.preparation_minutes, ics_url = EXCLUDED.ics_url, \
             override_date = EXCLUDED.override_date, \
             override_sleep_hour = EXCLUDED.override_sleep_hour, \
             override_sleep_minute = EXCLUDED.override_sleep_minute, \
             override_wake_hour = EXCLUDED.override_wake_hour, \
             override_wake_minute = EXCLUDED.override_wake_minute, updated_at = now() \
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(settings.wake_up_hour)
        .bind(settings.wake_up_minute)
        .bind(settings.sleep_duration_hours)
        .bind(settings.resilience_window_minutes)
        .bind(settings.mission_enabled)
        .bind(settings.mission_target)
        .bind(settings.preparation_minutes)
        .bind(settings.ics_url)
        .bind(override_date)
        .bind(override_sleep_hour)
        .bind(override_sleep_minute)
        .bind(override_wake_hour)
        .bind(override_wake_minute)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `PlanCacheService` Trait Implementation
//=========================================================================================

const PLAN_CACHE_COLUMNS: &str = "user_id, signature_hash, plan_json, created_at";

#[async_trait]
impl PlanCacheService for DbAdapter {
    async fn get_by_user_and_fingerprint(
        &self,
        user_id: Uuid,
        fingerprint: &str,
    ) -> PortResult<Option<CachedPlan>> {
        let record = sqlx::query_as::<_, CachedPlanRecord>(&format!(
            "SELECT {PLAN_CACHE_COLUMNS} FROM sleep_plan_cache \
             WHERE user_id = $1 AND signature_hash = $2"
        ))
        .bind(user_id)
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn get_by_user(&self, user_id: Uuid) -> PortResult<Option<CachedPlan>> {
        let record = sqlx::query_as::<_, CachedPlanRecord>(&format!(
            "SELECT {PLAN_CACHE_COLUMNS} FROM sleep_plan_cache WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn upsert(&self, user_id: Uuid, fingerprint: &str, plan: &Value) -> PortResult<()> {
        let plan_json = plan.to_string();
        sqlx::query(
            "INSERT INTO sleep_plan_cache (user_id, signature_hash, plan_json, created_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (user_id) DO UPDATE SET \
             signature_hash = EXCLUDED.signature_hash, \
             plan_json = EXCLUDED.plan_json, created_at = now()",
        )
        .bind(user_id)
        .bind(fingerprint)
        .bind(plan_json)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
