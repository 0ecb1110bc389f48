//! crates/sleep_coach_core/src/plan.rs
//!
//! The plan cache orchestrator: computes the request fingerprint, decides
//! cache hit vs. miss, and keeps the single-row-per-user cache discipline.
//! Generation and persistence stay behind ports so the flow is testable
//! against in-memory fakes.

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::PlanResult;
use crate::ports::{PlanCacheService, PlanGenerationService, PortResult};
use crate::signature::build_signature;

/// Orchestrates plan retrieval: cache lookup, generation, and upsert.
pub struct PlanService {
    cache: Arc<dyn PlanCacheService>,
    generator: Arc<dyn PlanGenerationService>,
}

impl PlanService {
    /// Creates a new `PlanService`.
    pub fn new(cache: Arc<dyn PlanCacheService>, generator: Arc<dyn PlanGenerationService>) -> Self {
        Self { cache, generator }
    }

    /// Returns the cached plan for the fingerprint of these inputs, or
    /// generates and persists a fresh one.
    ///
    /// With `force` the cache lookup is skipped entirely. A generation failure
    /// propagates to the caller and never writes the cache; the upsert runs
    /// only after the generator has returned a payload. At most one store
    /// write and one generator invocation happen per call. Concurrent calls
    /// for the same user are last-writer-wins, which is acceptable for an
    /// advisory cache.
    pub async fn get_or_create_plan(
        &self,
        user_id: Uuid,
        calendar_events: &[Value],
        sleep_logs: &[Value],
        settings: &Map<String, Value>,
        today_date: Option<&str>,
        force: bool,
    ) -> PortResult<PlanResult> {
        let fingerprint = build_signature(calendar_events, sleep_logs, settings, today_date);

        if !force {
            if let Some(cached) = self
                .cache
                .get_by_user_and_fingerprint(user_id, &fingerprint)
                .await?
            {
                return Ok(PlanResult {
                    plan: cached.plan,
                    cache_hit: true,
                });
            }
        }

        let plan = self
            .generator
            .generate_week_plan(
                calendar_events,
                sleep_logs,
                settings,
                today_date.unwrap_or_default(),
            )
            .await?;

        self.cache.upsert(user_id, &fingerprint, &plan).await?;

        Ok(PlanResult {
            plan,
            cache_hit: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CachedPlan;
    use crate::ports::PortError;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory plan cache with the same single-row-per-user semantics as
    /// the Postgres adapter.
    #[derive(Default)]
    struct InMemoryCache {
        rows: Mutex<HashMap<Uuid, CachedPlan>>,
    }

    impl InMemoryCache {
        fn row_for(&self, user_id: Uuid) -> Option<CachedPlan> {
            self.rows.lock().unwrap().get(&user_id).cloned()
        }
    }

    #[async_trait]
    impl PlanCacheService for InMemoryCache {
        async fn get_by_user_and_fingerprint(
            &self,
            user_id: Uuid,
            fingerprint: &str,
        ) -> PortResult<Option<CachedPlan>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .get(&user_id)
                .filter(|row| row.fingerprint == fingerprint)
                .cloned())
        }

        async fn get_by_user(&self, user_id: Uuid) -> PortResult<Option<CachedPlan>> {
            Ok(self.rows.lock().unwrap().get(&user_id).cloned())
        }

        async fn upsert(&self, user_id: Uuid, fingerprint: &str, plan: &Value) -> PortResult<()> {
            self.rows.lock().unwrap().insert(
                user_id,
                CachedPlan {
                    user_id,
                    fingerprint: fingerprint.to_string(),
                    plan: plan.clone(),
                    created_at: Utc::now(),
                },
            );
            Ok(())
        }
    }

    /// Fake generator that counts invocations and returns a canned payload,
    /// or fails when told to.
    struct FakeGenerator {
        calls: AtomicUsize,
        payload: Value,
        fail: bool,
    }

    impl FakeGenerator {
        fn returning(payload: Value) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload: Value::Null,
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlanGenerationService for FakeGenerator {
        async fn generate_week_plan(
            &self,
            _calendar_events: &[Value],
            _sleep_logs: &[Value],
            _settings: &Map<String, Value>,
            _today_date: &str,
        ) -> PortResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PortError::Unexpected("generator unavailable".to_string()));
            }
            Ok(self.payload.clone())
        }
    }

    fn week_plan() -> Value {
        json!({"week_plan": [{"date": "2026-02-20", "recommended_bedtime": "22:30", "advice": "wind down early"}]})
    }

    fn sample_settings() -> Map<String, Value> {
        json!({"wake_up_hour": 7, "sleep_duration_hours": 8})
            .as_object()
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn first_request_generates_and_persists() {
        let cache = Arc::new(InMemoryCache::default());
        let generator = Arc::new(FakeGenerator::returning(week_plan()));
        let service = PlanService::new(cache.clone(), generator.clone());
        let user_id = Uuid::new_v4();

        let result = service
            .get_or_create_plan(user_id, &[], &[], &sample_settings(), Some("2026-02-20"), false)
            .await
            .unwrap();

        assert!(!result.cache_hit);
        assert_eq!(result.plan, week_plan());
        assert_eq!(generator.call_count(), 1);
        let row = cache.row_for(user_id).unwrap();
        assert_eq!(row.fingerprint.len(), 64);
        assert_eq!(row.plan, week_plan());
    }

    #[tokio::test]
    async fn identical_second_request_hits_the_cache() {
        let cache = Arc::new(InMemoryCache::default());
        let generator = Arc::new(FakeGenerator::returning(week_plan()));
        let service = PlanService::new(cache.clone(), generator.clone());
        let user_id = Uuid::new_v4();
        let settings = sample_settings();

        let first = service
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-20"), false)
            .await
            .unwrap();
        let second = service
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-20"), false)
            .await
            .unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.plan, second.plan);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn force_regenerates_even_for_identical_inputs() {
        let cache = Arc::new(InMemoryCache::default());
        let generator = Arc::new(FakeGenerator::returning(week_plan()));
        let service = PlanService::new(cache.clone(), generator.clone());
        let user_id = Uuid::new_v4();
        let settings = sample_settings();

        service
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-20"), false)
            .await
            .unwrap();
        let forced = service
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-20"), true)
            .await
            .unwrap();

        assert!(!forced.cache_hit);
        assert_eq!(generator.call_count(), 2);
        assert!(cache.row_for(user_id).is_some());
    }

    #[tokio::test]
    async fn adding_a_today_override_is_a_cache_miss() {
        let cache = Arc::new(InMemoryCache::default());
        let generator = Arc::new(FakeGenerator::returning(week_plan()));
        let service = PlanService::new(cache.clone(), generator.clone());
        let user_id = Uuid::new_v4();

        service
            .get_or_create_plan(user_id, &[], &[], &sample_settings(), Some("2026-02-20"), false)
            .await
            .unwrap();

        let mut with_override = sample_settings();
        with_override.insert(
            "today_override".to_string(),
            json!({"date": "2026-02-20", "sleep_hour": 23, "sleep_minute": 0, "wake_hour": 7, "wake_minute": 0}),
        );
        let result = service
            .get_or_create_plan(user_id, &[], &[], &with_override, Some("2026-02-20"), false)
            .await
            .unwrap();

        assert!(!result.cache_hit);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn new_calendar_day_is_a_cache_miss() {
        let cache = Arc::new(InMemoryCache::default());
        let generator = Arc::new(FakeGenerator::returning(week_plan()));
        let service = PlanService::new(cache.clone(), generator.clone());
        let user_id = Uuid::new_v4();
        let settings = sample_settings();

        service
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-20"), false)
            .await
            .unwrap();
        let next_day = service
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-21"), false)
            .await
            .unwrap();

        assert!(!next_day.cache_hit);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn generator_failure_leaves_the_cache_untouched() {
        let cache = Arc::new(InMemoryCache::default());
        let ok_generator = Arc::new(FakeGenerator::returning(week_plan()));
        let user_id = Uuid::new_v4();
        let settings = sample_settings();

        PlanService::new(cache.clone(), ok_generator)
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-20"), false)
            .await
            .unwrap();
        let before = cache.row_for(user_id).unwrap();

        let failing = Arc::new(FakeGenerator::failing());
        let result = PlanService::new(cache.clone(), failing.clone())
            .get_or_create_plan(user_id, &[], &[], &settings, Some("2026-02-21"), false)
            .await;

        assert!(matches!(result, Err(PortError::Unexpected(_))));
        assert_eq!(failing.call_count(), 1);
        let after = cache.row_for(user_id).unwrap();
        assert_eq!(before.fingerprint, after.fingerprint);
        assert_eq!(before.plan, after.plan);
    }
}
