use axum::extract::State;
use axum::Json;

use super::link;
use crate::state::AppState;

/// GET /: service descriptor with HAL discovery links.
pub async fn get_root(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "deployer",
        "version": env!("CARGO_PKG_VERSION"),
        "_links": {
            "self": link(&app.config, "/"),
            "health": link(&app.config, "/health"),
            "deployments": link(&app.config, "/deployments"),
            "plan": link(&app.config, "/plan"),
        }
    }))
}
