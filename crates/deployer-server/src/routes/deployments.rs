use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use deployer_core::run_log::{format_timestamp, PassKind, RunRecord};
use serde::Deserialize;
use tracing::{info, info_span, Instrument};

use super::link;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeploymentRequest {
    dir: String,
    #[serde(default)]
    rev: String,
}

impl DeploymentRequest {
    fn parse(body: &[u8]) -> Result<Self, AppError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(format!("invalid deployment request: {e}")))?;
        if request.dir.trim().is_empty() {
            return Err(AppError::bad_request("'dir' must not be empty"));
        }
        Ok(request)
    }
}

/// GET /deployments: triggered runs, oldest first.
pub async fn list_deployments(State(app): State<AppState>) -> Json<serde_json::Value> {
    let runs = app.runs.lock().await;
    let records: Vec<&RunRecord> = runs.entries().collect();
    Json(serde_json::json!({
        "entries": runs.descriptions(),
        "runs": records,
        "_links": { "self": link(&app.config, "/deployments") }
    }))
}

/// GET /deployments/{id}: one run record, while it is still in the log.
pub async fn get_deployment(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RunRecord>, AppError> {
    let runs = app.runs.lock().await;
    runs.get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("run {id} not found")))
}

/// POST /deployments: trigger an apply pass.
pub async fn create_deployment(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    trigger(app, PassKind::Apply, &body).await
}

/// DELETE /deployments: trigger a delete pass.
pub async fn delete_deployment(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    trigger(app, PassKind::Delete, &body).await
}

/// Record the run and start the pass in the background. Responds before the
/// pass does any work.
async fn trigger(
    app: AppState,
    kind: PassKind,
    body: &[u8],
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let request = DeploymentRequest::parse(body)?;

    let now = Local::now();
    let record = app.runs.lock().await.record(kind, &request.rev, now);
    let id = record.id;
    info!(run_id = id, kind = %kind, dir = %request.dir, rev = %request.rev, "pass triggered");

    let runner = app.runner.clone();
    let runs = app.runs.clone();
    let dir = PathBuf::from(request.dir);
    let span = info_span!("pass", run_id = id, kind = %kind);
    tokio::spawn(
        async move {
            let report = runner.run(kind, &dir).await;
            let status = report.status();
            if !runs
                .lock()
                .await
                .finish(id, status, report.summary(), Local::now())
            {
                info!("run record evicted before completion");
            }
        }
        .instrument(span),
    );

    let run_path = format!("/deployments/{id}");
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "timestamp": format_timestamp(&now),
            "run_id": id,
            "_links": { "run": link(&app.config, &run_path) }
        })),
    ))
}
