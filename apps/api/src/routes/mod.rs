pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::advisor;
use crate::state::AppState;
use crate::stats;
use crate::users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Platform statistics
        .route(
            "/platform/:platform/:username",
            get(stats::handlers::handle_platform_stats),
        )
        // Account
        .route("/api/users/me", get(users::handlers::handle_me))
        .route("/api/settings", patch(users::handlers::handle_update_settings))
        .route("/api/profiles", get(users::handlers::handle_profiles))
        .route(
            "/api/sync-profiles",
            post(users::handlers::handle_sync_profiles),
        )
        // LLM proxying
        .route("/analyze", post(advisor::handlers::handle_analyze))
        .route("/chat", post(advisor::handlers::handle_chat))
        .with_state(state)
}
