//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use sleep_coach_core::ports::{
    DatabaseService, PlanCacheService, PlanGenerationService, TokenVerificationService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub plan_cache: Arc<dyn PlanCacheService>,
    pub plan_generator: Arc<dyn PlanGenerationService>,
    pub verifier: Arc<dyn TokenVerificationService>,
    pub config: Arc<Config>,
}
