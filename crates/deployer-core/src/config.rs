use crate::error::{DeployerError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ContextsConfig
// ---------------------------------------------------------------------------

/// kubeconfig context names of the two cluster targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextsConfig {
    #[serde(default = "default_private_context")]
    pub private: String,
    #[serde(default = "default_public_context")]
    pub public: String,
}

fn default_private_context() -> String {
    "minikube".to_string()
}

fn default_public_context() -> String {
    "bsc-aks".to_string()
}

impl Default for ContextsConfig {
    fn default() -> Self {
        Self {
            private: default_private_context(),
            public: default_public_context(),
        }
    }
}

// ---------------------------------------------------------------------------
// LabelScheme
// ---------------------------------------------------------------------------

/// Label keys shared by policy objects and workload manifests.
///
/// Workloads carry `<private>: supported` / `<public>: supported` labels;
/// policy objects list the keys of the contexts they allow in `spec.labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelScheme {
    #[serde(default = "default_group_label")]
    pub group: String,
    #[serde(default = "default_private_label")]
    pub private: String,
    #[serde(default = "default_public_label")]
    pub public: String,
    #[serde(default = "default_legacy_label")]
    pub legacy: String,
    #[serde(default = "default_supported_value")]
    pub supported_value: String,
}

fn default_group_label() -> String {
    "cloud-group".to_string()
}

fn default_private_label() -> String {
    format!("cloud-{}", default_private_context())
}

fn default_public_label() -> String {
    format!("cloud-{}", default_public_context())
}

fn default_legacy_label() -> String {
    "cloud-legacy".to_string()
}

fn default_supported_value() -> String {
    "supported".to_string()
}

impl Default for LabelScheme {
    fn default() -> Self {
        Self {
            group: default_group_label(),
            private: default_private_label(),
            public: default_public_label(),
            legacy: default_legacy_label(),
            supported_value: default_supported_value(),
        }
    }
}

// ---------------------------------------------------------------------------
// KubectlConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubectlConfig {
    #[serde(default = "default_kubectl_binary")]
    pub binary: String,
    #[serde(default = "default_kubectl_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
}

fn default_kubectl_binary() -> String {
    "kubectl".to_string()
}

fn default_kubectl_timeout() -> u64 {
    60
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            binary: default_kubectl_binary(),
            timeout_secs: default_kubectl_timeout(),
            kubeconfig: None,
        }
    }
}

impl KubectlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// LegacyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyConfig {
    #[serde(default = "default_host_annotation")]
    pub host_annotation: String,
    #[serde(default = "default_legacy_timeout")]
    pub timeout_secs: u64,
}

fn default_host_annotation() -> String {
    "legacy/host".to_string()
}

fn default_legacy_timeout() -> u64 {
    30
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            host_annotation: default_host_annotation(),
            timeout_secs: default_legacy_timeout(),
        }
    }
}

impl LegacyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Zero is accepted in the file but means a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub contexts: ContextsConfig,
    #[serde(default)]
    pub labels: LabelScheme,
    #[serde(default = "default_policy_kind")]
    pub policy_kind: String,
    #[serde(default)]
    pub kubectl: KubectlConfig,
    #[serde(default)]
    pub legacy: LegacyConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_run_log_capacity")]
    pub run_log_capacity: usize,
}

fn default_listen() -> String {
    "0.0.0.0:8082".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_policy_kind() -> String {
    "cpol".to_string()
}

fn default_run_log_capacity() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            base_url: default_base_url(),
            contexts: ContextsConfig::default(),
            labels: LabelScheme::default(),
            policy_kind: default_policy_kind(),
            kubectl: KubectlConfig::default(),
            legacy: LegacyConfig::default(),
            retry: RetryConfig::default(),
            run_log_capacity: default_run_log_capacity(),
        }
    }
}

impl Config {
    /// Resolve and load the configuration.
    ///
    /// Priority:
    /// 1. `explicit` (the `--config` flag or `DEPLOYER_CONFIG`), which must exist
    /// 2. `deployer.yaml` in `cwd`, if present
    /// 3. Built-in defaults
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(DeployerError::ConfigNotFound(path.display().to_string()));
            }
            return Self::load(path);
        }
        let local = paths::config_path(cwd);
        if local.exists() {
            return Self::load(&local);
        }
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(data)?;
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.contexts.private == self.contexts.public {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "private and public contexts are both '{}'",
                    self.contexts.private
                ),
            });
        }

        for (name, value) in [
            ("contexts.private", &self.contexts.private),
            ("contexts.public", &self.contexts.public),
            ("labels.group", &self.labels.group),
            ("labels.private", &self.labels.private),
            ("labels.public", &self.labels.public),
            ("labels.supported_value", &self.labels.supported_value),
            ("policy_kind", &self.policy_kind),
            ("legacy.host_annotation", &self.legacy.host_annotation),
        ] {
            if value.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{name} is empty"),
                });
            }
        }

        if self.labels.private == self.labels.public {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "private and public support labels are both '{}'",
                    self.labels.private
                ),
            });
        }

        if self.retry.max_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "retry.max_attempts is 0; calls run once".to_string(),
            });
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "retry.initial_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                    self.retry.initial_delay_ms, self.retry.max_delay_ms
                ),
            });
        }

        if self.kubectl.timeout_secs == 0 || self.legacy.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "timeouts must be at least one second".to_string(),
            });
        }

        if self.run_log_capacity == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "run_log_capacity must be at least 1".to_string(),
            });
        }

        warnings
    }

    /// Fail with the first error-level warning, if any.
    pub fn ensure_valid(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(DeployerError::InvalidConfig(w.message)),
            None => Ok(()),
        }
    }
}
