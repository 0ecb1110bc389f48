pub mod db;
pub mod plan_llm;
pub mod supabase_auth;

pub use db::DbAdapter;
pub use plan_llm::OpenRouterPlanAdapter;
pub use supabase_auth::SupabaseVerifier;
