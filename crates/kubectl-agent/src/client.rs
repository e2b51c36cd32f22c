use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use deployer_core::config::KubectlConfig;
use deployer_core::control_plane::ControlPlane;
use deployer_core::selector::Selector;
use deployer_core::Result;

use crate::error::KubectlError;
use crate::process;

/// [`ControlPlane`] backed by the `kubectl` binary.
///
/// Every cluster call is pinned with `--context`; only [`set_context`]
/// touches the kubeconfig's active context.
///
/// [`set_context`]: ControlPlane::set_context
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: PathBuf,
    timeout: Duration,
    kubeconfig: Option<PathBuf>,
}

impl Kubectl {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(60),
            kubeconfig: None,
        }
    }

    pub fn from_config(config: &KubectlConfig) -> Self {
        Self {
            binary: config.binary.clone().into(),
            timeout: config.timeout(),
            kubeconfig: config.kubeconfig.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Fail fast when the binary is not installed.
    pub fn locate(&self) -> std::result::Result<PathBuf, KubectlError> {
        process::locate(&self.binary)
    }

    async fn run(&self, context: Option<&str>, args: Args) -> Result<Vec<u8>> {
        let mut full: Vec<OsString> = Vec::with_capacity(args.0.len() + 4);
        if let Some(kubeconfig) = &self.kubeconfig {
            full.push("--kubeconfig".into());
            full.push(kubeconfig.clone().into_os_string());
        }
        if let Some(context) = context {
            full.push("--context".into());
            full.push(context.into());
        }
        full.extend(args.0);
        Ok(process::run(&self.binary, &full, self.timeout).await?)
    }
}

/// Argument builder for a single kubectl subcommand.
struct Args(Vec<OsString>);

impl Args {
    fn new(verb: &str) -> Self {
        Self(vec![verb.into()])
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.0.push(arg.into());
        self
    }

    fn files(self, path: &Path) -> Self {
        self.arg("-f").arg(path.as_os_str()).arg("-R")
    }

    fn selector(self, selector: &Selector) -> Self {
        if selector.is_empty() {
            self
        } else {
            self.arg("-l").arg(selector.to_string())
        }
    }

    fn ignore_not_found(self) -> Self {
        self.arg("--ignore-not-found=true")
    }
}

#[async_trait]
impl ControlPlane for Kubectl {
    async fn set_context(&self, context: &str) -> Result<()> {
        self.run(None, Args::new("config").arg("use-context").arg(context))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        context: &str,
        kind: &str,
        selector: Option<&Selector>,
    ) -> Result<String> {
        let mut args = Args::new("get").arg(kind).arg("-A").arg("-o").arg("json");
        if let Some(selector) = selector {
            args = args.selector(selector);
        }
        let out = self.run(Some(context), args).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn version(&self, context: &str) -> Result<String> {
        let out = self
            .run(Some(context), Args::new("version").arg("-o").arg("json"))
            .await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn apply(&self, context: &str, path: &Path, selector: &Selector) -> Result<()> {
        self.run(Some(context), Args::new("apply").files(path).selector(selector))
            .await?;
        Ok(())
    }

    async fn delete(&self, context: &str, path: &Path, selector: &Selector) -> Result<()> {
        let args = Args::new("delete")
            .files(path)
            .selector(selector)
            .ignore_not_found();
        self.run(Some(context), args).await?;
        Ok(())
    }

    async fn apply_dir(&self, context: &str, path: &Path) -> Result<()> {
        self.run(Some(context), Args::new("apply").files(path)).await?;
        Ok(())
    }

    async fn delete_dir(&self, context: &str, path: &Path) -> Result<()> {
        self.run(Some(context), Args::new("delete").files(path).ignore_not_found())
            .await?;
        Ok(())
    }

    async fn apply_server_side(&self, context: &str, path: &Path) -> Result<()> {
        let args = Args::new("apply").files(path).arg("--server-side=true");
        self.run(Some(context), args).await?;
        Ok(())
    }

    async fn delete_all(&self, context: &str, kind: &str) -> Result<()> {
        let args = Args::new("delete")
            .arg(kind)
            .arg("--all")
            .arg("-A")
            .ignore_not_found();
        self.run(Some(context), args).await?;
        Ok(())
    }

    async fn render(&self, context: &str, path: &Path, selector: &Selector) -> Result<Vec<u8>> {
        let args = Args::new("apply")
            .files(path)
            .selector(selector)
            .arg("-o")
            .arg("json")
            .arg("--dry-run=client");
        self.run(Some(context), args).await
    }
}
