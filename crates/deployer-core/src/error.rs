use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployerError {
    #[error("control plane unavailable: {command}: {reason}")]
    ControlPlaneUnavailable { command: String, reason: String },

    #[error("control plane returned unreadable output: {0}")]
    InvalidControlPlaneOutput(String),

    #[error("malformed policy data in '{policy}': {reason}")]
    MalformedPolicyData { policy: String, reason: String },

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("workload '{workload}' has no routing annotation '{annotation}'")]
    RoutingAnnotationMissing {
        workload: String,
        annotation: String,
    },

    #[error("legacy transport failure calling {url}: {reason}")]
    TransportFailure { url: String, reason: String },

    #[error("legacy host rejected {url} with status {status}")]
    LegacyRejected { url: String, status: u16 },

    #[error("legacy host failed {url} with status {status}")]
    LegacyServerError { url: String, status: u16 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployerError {
    /// Transport-class failures that may succeed on a later attempt.
    /// Data-validation errors never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ControlPlaneUnavailable { .. }
                | Self::TransportFailure { .. }
                | Self::LegacyServerError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DeployerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        let cp = DeployerError::ControlPlaneUnavailable {
            command: "kubectl get cpol".into(),
            reason: "timed out after 60s".into(),
        };
        assert!(cp.is_retryable());

        let http = DeployerError::TransportFailure {
            url: "http://legacy-1/processes".into(),
            reason: "connection refused".into(),
        };
        assert!(http.is_retryable());

        let server = DeployerError::LegacyServerError {
            url: "http://legacy-1/processes".into(),
            status: 503,
        };
        assert!(server.is_retryable());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let missing = DeployerError::RoutingAnnotationMissing {
            workload: "billing".into(),
            annotation: "legacy/host".into(),
        };
        assert!(!missing.is_retryable());

        let rejected = DeployerError::LegacyRejected {
            url: "http://legacy-1/processes".into(),
            status: 400,
        };
        assert!(!rejected.is_retryable());
        assert!(!DeployerError::MalformedManifest("not json".into()).is_retryable());
    }

    #[test]
    fn routing_annotation_message_names_workload() {
        let err = DeployerError::RoutingAnnotationMissing {
            workload: "billing".into(),
            annotation: "legacy/host".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("billing"));
        assert!(msg.contains("legacy/host"));
    }
}
