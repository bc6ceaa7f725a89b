use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::db::check_db_health;
use crate::state::AppState;

/// GET /health
/// Returns service status plus a database connectivity probe.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let database = check_db_health(&state.db).await;
    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "service": "nexus-api",
        "database": database,
        "last_checked": Utc::now(),
    }))
}
