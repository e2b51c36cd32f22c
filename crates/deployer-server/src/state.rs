use std::sync::Arc;

use deployer_core::config::Config;
use deployer_core::control_plane::ControlPlane;
use deployer_core::run_log::RunLog;
use deployer_core::Result;
use tokio::sync::Mutex;

use crate::pass::PassRunner;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runner: PassRunner,
    /// Diagnostic only; bounded by `config.run_log_capacity`.
    pub runs: Arc<Mutex<RunLog>>,
}

impl AppState {
    pub fn new(config: Config, control_plane: Arc<dyn ControlPlane>) -> Result<Self> {
        let runner = PassRunner::new(Arc::new(config), control_plane)?;
        Ok(Self::from_runner(runner))
    }

    pub fn from_runner(runner: PassRunner) -> Self {
        let config = Arc::clone(runner.config());
        let runs = RunLog::new(config.run_log_capacity);
        Self {
            config,
            runner,
            runs: Arc::new(Mutex::new(runs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCluster;

    #[test]
    fn new_state_sizes_run_log_from_config() {
        let config = Config {
            run_log_capacity: 7,
            ..Config::default()
        };
        let state = AppState::new(config, Arc::new(FakeCluster::new())).unwrap();
        assert_eq!(state.config.run_log_capacity, 7);
        assert!(state.runs.try_lock().unwrap().is_empty());
    }
}
