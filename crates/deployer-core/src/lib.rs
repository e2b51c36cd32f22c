pub mod catalog;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod planner;
pub mod report;
pub mod run_log;
pub mod selector;
pub mod types;

pub use error::{DeployerError, Result};
