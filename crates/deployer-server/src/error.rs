use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deployer_core::DeployerError;

/// A status chosen by the handler itself, carried through the
/// `anyhow::Error` chain.
#[derive(Debug)]
struct Explicit {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for Explicit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Explicit {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. The body is always `{"error": …}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn explicit(status: StatusCode, message: impl Into<String>) -> Self {
        Self(
            Explicit {
                status,
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::explicit(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::explicit(StatusCode::NOT_FOUND, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(explicit) = self.0.downcast_ref::<Explicit>() {
            explicit.status
        } else if let Some(e) = self.0.downcast_ref::<DeployerError>() {
            match e {
                DeployerError::ControlPlaneUnavailable { .. }
                | DeployerError::TransportFailure { .. }
                | DeployerError::LegacyServerError { .. } => StatusCode::SERVICE_UNAVAILABLE,
                DeployerError::InvalidControlPlaneOutput(_)
                | DeployerError::LegacyRejected { .. } => StatusCode::BAD_GATEWAY,
                DeployerError::MalformedPolicyData { .. }
                | DeployerError::MalformedManifest(_)
                | DeployerError::RoutingAnnotationMissing { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                DeployerError::Json(_) => StatusCode::BAD_REQUEST,
                DeployerError::InvalidConfig(_)
                | DeployerError::ConfigNotFound(_)
                | DeployerError::Io(_)
                | DeployerError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
