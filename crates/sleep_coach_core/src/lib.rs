pub mod canonical;
pub mod domain;
pub mod plan;
pub mod ports;
pub mod signature;

pub use domain::{
    CachedPlan, PlanResult, SleepLog, SleepLogPatch, SleepSettings, TodayOverride, User,
};
pub use plan::PlanService;
pub use ports::{
    DatabaseService, PlanCacheService, PlanGenerationService, PortError, PortResult,
    TokenVerificationService,
};
pub use signature::build_signature;
