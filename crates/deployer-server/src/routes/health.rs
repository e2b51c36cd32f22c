use axum::extract::State;
use axum::Json;

use super::link;
use crate::state::AppState;

/// GET /health: liveness only; never touches the cluster.
pub async fn get_health(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "_links": { "self": link(&app.config, "/health") }
    }))
}
