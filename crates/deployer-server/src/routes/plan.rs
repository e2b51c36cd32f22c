use axum::extract::State;
use axum::Json;
use deployer_core::catalog::PolicyCatalog;
use deployer_core::planner::{plan_group, GroupPlan};

use super::link;
use crate::error::AppError;
use crate::state::AppState;

/// GET /plan: read the live policy catalog and return every group's plan
/// without executing anything.
pub async fn get_plan(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let groups = PolicyCatalog::from_config(app.runner.control_plane(), &app.config)
        .list_groups()
        .await?;
    let plans: Vec<GroupPlan> = groups
        .values()
        .map(|group| plan_group(group, &app.config.labels))
        .collect();

    Ok(Json(serde_json::json!({
        "groups": plans,
        "_links": { "self": link(&app.config, "/plan") }
    })))
}
