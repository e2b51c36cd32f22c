pub mod config;
pub mod pass;
pub mod plan;
pub mod serve;

use anyhow::Context;
use deployer_core::config::Config;
use std::path::Path;

pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    Config::resolve(explicit, &cwd).context("failed to load config")
}
