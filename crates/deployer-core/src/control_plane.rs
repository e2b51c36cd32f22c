use crate::error::Result;
use crate::selector::Selector;
use async_trait::async_trait;
use std::path::Path;

/// The cluster control-plane client.
///
/// Every call names its kubeconfig context explicitly; implementations must
/// not fall back to whatever context happens to be active, so that passes
/// running side by side never observe each other's target.
///
/// Applies and deletes operate recursively on the manifests under `path`.
/// Deletes succeed when nothing matches.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Make `context` the active context of the kubeconfig.
    async fn set_context(&self, context: &str) -> Result<()>;

    /// List all objects of `kind` across namespaces as JSON.
    async fn query(&self, context: &str, kind: &str, selector: Option<&Selector>)
        -> Result<String>;

    /// Client and server version report for `context`.
    async fn version(&self, context: &str) -> Result<String>;

    async fn apply(&self, context: &str, path: &Path, selector: &Selector) -> Result<()>;

    async fn delete(&self, context: &str, path: &Path, selector: &Selector) -> Result<()>;

    async fn apply_dir(&self, context: &str, path: &Path) -> Result<()>;

    async fn delete_dir(&self, context: &str, path: &Path) -> Result<()>;

    async fn apply_server_side(&self, context: &str, path: &Path) -> Result<()>;

    /// Delete every object of `kind` in every namespace.
    async fn delete_all(&self, context: &str, kind: &str) -> Result<()>;

    /// Dry-run the manifests under `path` matching `selector` and return the
    /// rendered JSON: a single object, or a `List` when several match.
    async fn render(&self, context: &str, path: &Path, selector: &Selector) -> Result<Vec<u8>>;
}
