use axum::extract::State;
use axum::Json;

use crate::broadcaster::SyncStats;
use crate::state::AppState;

/// GET /api/sync/stats: live sessions and channels.
pub async fn stats(State(app): State<AppState>) -> Json<SyncStats> {
    Json(app.broadcaster.stats())
}

/// GET /api/health
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "show": app.config.show.name,
    }))
}
