use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use deployer_core::config::Config;
use deployer_core::control_plane::ControlPlane;
use deployer_core::selector::Selector;
use deployer_core::{DeployerError, Result};
use deployer_server::{build_router, AppState};
use http_body_util::BodyExt;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Control planes
// ---------------------------------------------------------------------------

/// Serves a fixed policy listing and accepts every mutation.
struct StaticCluster {
    listing: String,
}

/// Fails every call as if `kubectl` could not reach the API server.
struct OfflineCluster;

fn unreachable(command: &str) -> DeployerError {
    DeployerError::ControlPlaneUnavailable {
        command: command.to_string(),
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl ControlPlane for StaticCluster {
    async fn set_context(&self, _context: &str) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _context: &str, _kind: &str, _selector: Option<&Selector>) -> Result<String> {
        Ok(self.listing.clone())
    }

    async fn version(&self, _context: &str) -> Result<String> {
        Ok("{}".to_string())
    }

    async fn apply(&self, _context: &str, _path: &Path, _selector: &Selector) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _context: &str, _path: &Path, _selector: &Selector) -> Result<()> {
        Ok(())
    }

    async fn apply_dir(&self, _context: &str, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn delete_dir(&self, _context: &str, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn apply_server_side(&self, _context: &str, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn delete_all(&self, _context: &str, _kind: &str) -> Result<()> {
        Ok(())
    }

    async fn render(&self, _context: &str, _path: &Path, _selector: &Selector) -> Result<Vec<u8>> {
        Ok(br#"{"kind":"List","items":[]}"#.to_vec())
    }
}

#[async_trait]
impl ControlPlane for OfflineCluster {
    async fn set_context(&self, _context: &str) -> Result<()> {
        Err(unreachable("kubectl config use-context"))
    }

    async fn query(&self, _context: &str, _kind: &str, _selector: Option<&Selector>) -> Result<String> {
        Err(unreachable("kubectl get"))
    }

    async fn version(&self, _context: &str) -> Result<String> {
        Err(unreachable("kubectl version"))
    }

    async fn apply(&self, _context: &str, _path: &Path, _selector: &Selector) -> Result<()> {
        Err(unreachable("kubectl apply"))
    }

    async fn delete(&self, _context: &str, _path: &Path, _selector: &Selector) -> Result<()> {
        Err(unreachable("kubectl delete"))
    }

    async fn apply_dir(&self, _context: &str, _path: &Path) -> Result<()> {
        Err(unreachable("kubectl apply"))
    }

    async fn delete_dir(&self, _context: &str, _path: &Path) -> Result<()> {
        Err(unreachable("kubectl delete"))
    }

    async fn apply_server_side(&self, _context: &str, _path: &Path) -> Result<()> {
        Err(unreachable("kubectl apply --server-side"))
    }

    async fn delete_all(&self, _context: &str, _kind: &str) -> Result<()> {
        Err(unreachable("kubectl delete --all"))
    }

    async fn render(&self, _context: &str, _path: &Path, _selector: &Selector) -> Result<Vec<u8>> {
        Err(unreachable("kubectl apply --dry-run=client"))
    }
}

fn listing(groups: &[(&str, &[&str])]) -> String {
    let items: Vec<_> = groups
        .iter()
        .map(|(group, labels)| {
            serde_json::json!({
                "kind": "CloudPolicy",
                "metadata": {
                    "name": format!("{group}-policy"),
                    "namespace": "policies",
                    "labels": { "cloud-group": group },
                },
                "spec": { "labels": labels },
            })
        })
        .collect();
    serde_json::json!({ "apiVersion": "v1", "kind": "List", "items": items }).to_string()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> Config {
    let mut config = Config::default();
    config.base_url = "http://deployer.test/".to_string();
    config.retry.max_attempts = 1;
    config
}

fn app_with(control_plane: Arc<dyn ControlPlane>) -> axum::Router {
    let state = AppState::new(test_config(), control_plane).unwrap();
    build_router(state)
}

fn static_app(groups: &[(&str, &[&str])]) -> (axum::Router, AppState) {
    let cluster = StaticCluster {
        listing: listing(groups),
    };
    let state = AppState::new(test_config(), Arc::new(cluster)).unwrap();
    (build_router(state.clone()), state)
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<&[u8]>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let req = builder
        .body(match body {
            Some(bytes) => axum::body::Body::from(bytes.to_vec()),
            None => axum::body::Body::empty(),
        })
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

/// Wait until run `id` leaves the running state.
async fn wait_for_run(state: &AppState, id: u64) -> deployer_core::run_log::RunRecord {
    for _ in 0..200 {
        if let Some(record) = state.runs.lock().await.get(id) {
            if record.status.is_terminal() {
                return record.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {id} did not finish");
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_lists_hal_links() {
    let (app, _) = static_app(&[]);
    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "deployer");
    assert_eq!(body["_links"]["self"]["href"], "http://deployer.test/");
    assert_eq!(body["_links"]["health"]["href"], "http://deployer.test/health");
    assert_eq!(
        body["_links"]["deployments"]["href"],
        "http://deployer.test/deployments"
    );
    assert_eq!(body["_links"]["plan"]["href"], "http://deployer.test/plan");
}

#[tokio::test]
async fn health_never_touches_the_cluster() {
    let (status, body) = get(app_with(Arc::new(OfflineCluster)), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["_links"]["self"]["href"], "http://deployer.test/health");
}

// ---------------------------------------------------------------------------
// Deployments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_deployment_returns_accepted_with_timestamp() {
    let (app, state) = static_app(&[("web", &["cloud-minikube"])]);
    let dir = tempfile::TempDir::new().unwrap();
    let body = serde_json::json!({ "dir": dir.path(), "rev": "abc123" }).to_string();

    let (status, json) = send(app, "POST", "/deployments", Some(body.as_bytes())).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let timestamp = json["timestamp"].as_str().unwrap();
    assert!(
        chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").is_ok(),
        "unexpected timestamp format: {timestamp}"
    );
    let id = json["run_id"].as_u64().unwrap();
    assert_eq!(
        json["_links"]["run"]["href"],
        format!("http://deployer.test/deployments/{id}")
    );

    let record = wait_for_run(&state, id).await;
    assert_eq!(record.description, "apply: abc123");
}

#[tokio::test]
async fn delete_deployment_records_a_delete_run() {
    let (app, state) = static_app(&[]);
    let dir = tempfile::TempDir::new().unwrap();
    let body = serde_json::json!({ "dir": dir.path() }).to_string();

    let (status, json) = send(app, "DELETE", "/deployments", Some(body.as_bytes())).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let record = wait_for_run(&state, json["run_id"].as_u64().unwrap()).await;
    assert!(record.description.starts_with("delete"));
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (app, _) = static_app(&[]);
    let (status, json) = send(app, "POST", "/deployments", Some(b"{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid deployment request"));
}

#[tokio::test]
async fn empty_dir_is_rejected() {
    let (app, state) = static_app(&[]);
    let (status, _) = send(app, "POST", "/deployments", Some(br#"{"dir":"  "}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.runs.lock().await.is_empty());
}

#[tokio::test]
async fn list_shows_triggered_runs() {
    let (app, state) = static_app(&[]);
    let dir = tempfile::TempDir::new().unwrap();
    let body = serde_json::json!({ "dir": dir.path(), "rev": "r1" }).to_string();

    let (_, first) = send(app.clone(), "POST", "/deployments", Some(body.as_bytes())).await;
    wait_for_run(&state, first["run_id"].as_u64().unwrap()).await;

    let (status, json) = get(app, "/deployments").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json["entries"].as_object().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries.values().next().unwrap(), "apply: r1");
    assert_eq!(json["runs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn run_lookup() {
    let (app, state) = static_app(&[]);
    let dir = tempfile::TempDir::new().unwrap();
    let body = serde_json::json!({ "dir": dir.path() }).to_string();

    let (_, json) = send(app.clone(), "POST", "/deployments", Some(body.as_bytes())).await;
    let id = json["run_id"].as_u64().unwrap();
    wait_for_run(&state, id).await;

    let (status, run) = get(app.clone(), &format!("/deployments/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["id"], id);

    let (status, missing) = get(app, "/deployments/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(missing["error"].as_str().unwrap().contains("9999"));
}

#[tokio::test]
async fn unreachable_cluster_fails_the_run_not_the_request() {
    let state = AppState::new(test_config(), Arc::new(OfflineCluster)).unwrap();
    let app = build_router(state.clone());
    let dir = tempfile::TempDir::new().unwrap();
    let body = serde_json::json!({ "dir": dir.path() }).to_string();

    let (status, json) = send(app, "POST", "/deployments", Some(body.as_bytes())).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let record = wait_for_run(&state, json["run_id"].as_u64().unwrap()).await;
    assert_eq!(record.status, deployer_core::run_log::RunStatus::Failed);
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plan_reports_every_group() {
    let (app, _) = static_app(&[
        ("web", &["cloud-minikube", "cloud-bsc-aks"]),
        ("batch", &["cloud-minikube=supported"]),
    ]);
    let (status, json) = get(app, "/plan").await;

    assert_eq!(status, StatusCode::OK);
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    let decision = |name: &str| {
        groups
            .iter()
            .find(|g| g["group"] == name)
            .map(|g| g["decision"].clone())
            .unwrap()
    };
    assert_eq!(decision("web"), "both");
    assert_eq!(decision("batch"), "private_only");
}

#[tokio::test]
async fn plan_with_unreachable_cluster_is_503() {
    let (status, json) = get(app_with(Arc::new(OfflineCluster)), "/plan").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("kubectl get"));
}
