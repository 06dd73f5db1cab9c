//! Health endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.services.health_check(&state.database).await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let stats = if status.database_healthy {
        state.database.get_system_stats().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to collect system stats");
            Value::Null
        })
    } else {
        Value::Null
    };

    (
        code,
        Json(json!({
            "status": if status.is_healthy() { "ok" } else { "degraded" },
            "version": crate::VERSION,
            "services": status,
            "issues": status.get_issues(),
            "stats": stats,
            "notifications": state.services.notifications.get_stats(),
        })),
    )
}
