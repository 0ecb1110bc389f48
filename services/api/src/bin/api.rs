//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, plan_llm::OpenRouterPlanAdapter, supabase_auth::SupabaseVerifier},
    config::Config,
    error::ApiError,
    web::{
        middleware::require_auth,
        plan::get_or_create_plan_handler,
        rest::{db_health_handler, health_handler, ApiDoc},
        settings::{get_settings_handler, put_settings_handler},
        sleep_logs::{create_sleep_log_handler, list_sleep_logs_handler, update_sleep_log_handler},
        state::AppState,
        users::{
            create_user_handler, delete_user_handler, get_user_handler, list_users_handler,
            update_user_handler,
        },
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openrouter_config = OpenAIConfig::new()
        .with_api_base(&config.openrouter_base_url)
        .with_api_key(
            config
                .openrouter_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("OPENROUTER_API_KEY is required".to_string()))?,
        );
    let openrouter_client = Client::with_config(openrouter_config);

    let plan_generator = Arc::new(OpenRouterPlanAdapter::new(
        openrouter_client,
        config.plan_model.clone(),
        Duration::from_secs(config.plan_timeout_secs),
    ));

    let verifier = Arc::new(
        SupabaseVerifier::new(&config.supabase_url, &config.supabase_anon_key)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter.clone(),
        plan_cache: db_adapter,
        plan_generator,
        verifier,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/health/db", get(db_health_handler))
        .route("/users", post(create_user_handler).get(list_users_handler))
        .route(
            "/users/{user_id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/settings",
            get(get_settings_handler).put(put_settings_handler),
        )
        .route(
            "/sleep-logs",
            get(list_sleep_logs_handler).post(create_sleep_log_handler),
        )
        .route("/sleep-logs/{log_id}", patch(update_sleep_log_handler))
        .route("/plan", post(get_or_create_plan_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes under the versioned prefix
    let api_router = Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
