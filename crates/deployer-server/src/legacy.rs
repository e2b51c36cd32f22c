//! Bridge to the legacy process runtime.
//!
//! A legacy workload is deployed by posting its rendered manifest to
//! `{host}/processes` and terminated with `DELETE {host}/processes/{name}`,
//! where `host` comes from the workload's template annotation.

use std::fmt;

use deployer_core::config::LegacyConfig;
use deployer_core::manifest::LegacyWorkload;
use deployer_core::report::LegacyOutcome;
use deployer_core::{DeployerError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{error, info, warn};

use crate::retry::{retry_with_backoff, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyOp {
    Deploy,
    Terminate,
}

impl fmt::Display for LegacyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LegacyOp::Deploy => "deploy",
            LegacyOp::Terminate => "terminate",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LegacyAdapter {
    client: reqwest::Client,
    annotation: String,
    retry: RetryPolicy,
}

impl LegacyAdapter {
    pub fn new(config: &LegacyConfig, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DeployerError::InvalidConfig(format!("legacy http client: {e}")))?;
        Ok(Self {
            client,
            annotation: config.host_annotation.clone(),
            retry,
        })
    }

    /// Create the workload on its legacy host. Returns the response status.
    pub async fn deploy(&self, payload: Vec<u8>) -> Result<u16> {
        let workload = LegacyWorkload::parse(payload, &self.annotation)?;
        self.send(LegacyOp::Deploy, &workload).await
    }

    /// Terminate the workload on its legacy host. A `404` counts as success.
    pub async fn terminate(&self, payload: Vec<u8>) -> Result<u16> {
        let workload = LegacyWorkload::parse(payload, &self.annotation)?;
        self.send(LegacyOp::Terminate, &workload).await
    }

    /// Apply `op` to every payload in order. A failing workload never stops
    /// its siblings.
    pub async fn run_all(
        &self,
        op: LegacyOp,
        payloads: impl IntoIterator<Item = Vec<u8>>,
    ) -> Vec<LegacyOutcome> {
        let mut outcomes = Vec::new();
        for (index, payload) in payloads.into_iter().enumerate() {
            outcomes.push(self.run_one(op, index, payload).await);
        }
        outcomes
    }

    async fn run_one(&self, op: LegacyOp, index: usize, payload: Vec<u8>) -> LegacyOutcome {
        let workload = match LegacyWorkload::parse(payload, &self.annotation) {
            Ok(w) => w,
            Err(e) => {
                let name = match &e {
                    DeployerError::RoutingAnnotationMissing { workload, .. } => workload.clone(),
                    _ => format!("item {index}"),
                };
                warn!(workload = %name, op = %op, error = %e, "legacy workload skipped");
                return LegacyOutcome {
                    workload: name,
                    host: None,
                    status: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let result = self.send(op, &workload).await;
        let (status, error) = match result {
            Ok(status) => (Some(status), None),
            Err(e) => {
                error!(workload = %workload.name, host = %workload.routing_host, op = %op, error = %e, "legacy call failed");
                let status = match &e {
                    DeployerError::LegacyRejected { status, .. }
                    | DeployerError::LegacyServerError { status, .. } => Some(*status),
                    _ => None,
                };
                (status, Some(e.to_string()))
            }
        };
        LegacyOutcome {
            workload: workload.name,
            host: Some(workload.routing_host),
            status,
            error,
        }
    }

    async fn send(&self, op: LegacyOp, workload: &LegacyWorkload) -> Result<u16> {
        let url = match op {
            LegacyOp::Deploy => workload.processes_url(),
            LegacyOp::Terminate => workload.process_url(),
        };
        let operation = format!("legacy {op} {}", workload.name);

        let client = &self.client;
        let url = url.as_str();
        let body = workload.payload.as_slice();
        let name = workload.name.as_str();
        let host = workload.routing_host.as_str();

        retry_with_backoff(&self.retry, &operation, move || async move {
            let request = match op {
                LegacyOp::Deploy => client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.to_vec()),
                LegacyOp::Terminate => client.delete(url),
            };
            let response = request
                .send()
                .await
                .map_err(|e| DeployerError::TransportFailure {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(url, error = %e, "failed to read legacy response body");
                    String::new()
                }
            };
            info!(
                workload = %name,
                host = %host,
                op = %op,
                status = status.as_u16(),
                body = %text,
                "legacy response"
            );
            classify(op, url, status)
        })
        .await
    }
}

fn classify(op: LegacyOp, url: &str, status: StatusCode) -> Result<u16> {
    if status.is_success() || (op == LegacyOp::Terminate && status == StatusCode::NOT_FOUND) {
        return Ok(status.as_u16());
    }
    let url = url.to_string();
    let status = status.as_u16();
    if (500..600).contains(&status) {
        Err(DeployerError::LegacyServerError { url, status })
    } else {
        Err(DeployerError::LegacyRejected { url, status })
    }
}
