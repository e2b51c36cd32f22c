pub mod deployments;
pub mod health;
pub mod plan;
pub mod root;

use deployer_core::config::Config;

/// HAL link object `{"href": base_url + path}`.
pub(crate) fn link(config: &Config, path: &str) -> serde_json::Value {
    serde_json::json!({ "href": format!("{}{}", config.base_url.trim_end_matches('/'), path) })
}
