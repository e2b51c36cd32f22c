use deployer_core::DeployerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KubectlError {
    #[error("kubectl binary '{0}' not found on PATH")]
    NotFound(String),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' did not finish within {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("'{command}' exited with status {code}: {stderr}")]
    Exited {
        command: String,
        code: i32,
        stderr: String,
    },
}

impl KubectlError {
    pub fn command(&self) -> &str {
        match self {
            Self::NotFound(binary) => binary,
            Self::Spawn { command, .. }
            | Self::Timeout { command, .. }
            | Self::Exited { command, .. } => command,
        }
    }
}

impl From<KubectlError> for DeployerError {
    fn from(e: KubectlError) -> Self {
        let reason = match &e {
            // Retrying cannot install the binary.
            KubectlError::NotFound(_) => return DeployerError::InvalidConfig(e.to_string()),
            KubectlError::Spawn { source, .. } => source.to_string(),
            KubectlError::Timeout { secs, .. } => format!("timed out after {secs}s"),
            KubectlError::Exited { code, stderr, .. } => {
                if stderr.is_empty() {
                    format!("exit status {code}")
                } else {
                    format!("exit status {code}: {stderr}")
                }
            }
        };
        DeployerError::ControlPlaneUnavailable {
            command: e.command().to_string(),
            reason,
        }
    }
}
