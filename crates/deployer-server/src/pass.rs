//! Apply and delete passes over one deployment directory.
//!
//! ```text
//! apply:  versions → namespaces → policy CRD (server-side) → drop policies
//!         → definitions → catalog → per-group reconcile → reset context
//!         → legacy deploy
//! delete: apps (both contexts) → policies, namespaces → legacy terminate
//!         → reset context
//! ```

use std::path::Path;
use std::sync::Arc;

use deployer_core::catalog::PolicyCatalog;
use deployer_core::config::Config;
use deployer_core::control_plane::ControlPlane;
use deployer_core::manifest;
use deployer_core::paths;
use deployer_core::report::PassReport;
use deployer_core::run_log::PassKind;
use deployer_core::selector;
use deployer_core::types::Context;
use deployer_core::Result;
use tracing::{error, info, warn};

use crate::legacy::{LegacyAdapter, LegacyOp};
use crate::reconcile::{reset_context, ReconciliationDriver};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Everything a pass needs, cheap to clone into a background task.
#[derive(Clone)]
pub struct PassRunner {
    config: Arc<Config>,
    control_plane: Arc<dyn ControlPlane>,
    legacy: Arc<LegacyAdapter>,
    retry: RetryPolicy,
}

impl PassRunner {
    pub fn new(config: Arc<Config>, control_plane: Arc<dyn ControlPlane>) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.retry);
        let legacy = LegacyAdapter::new(&config.legacy, retry.clone())?;
        Ok(Self {
            config,
            control_plane,
            legacy: Arc::new(legacy),
            retry,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn control_plane(&self) -> &dyn ControlPlane {
        self.control_plane.as_ref()
    }

    pub async fn run(&self, kind: PassKind, dir: &Path) -> PassReport {
        match kind {
            PassKind::Apply => self.apply(dir).await,
            PassKind::Delete => self.delete(dir).await,
        }
    }

    /// Bootstrap policies, reconcile every group, then deploy legacy workloads.
    pub async fn apply(&self, dir: &Path) -> PassReport {
        let mut report = PassReport::new(PassKind::Apply);
        let cp = self.control_plane.as_ref();
        let private = self.config.contexts.private.as_str();
        info!(dir = %dir.display(), "apply pass started");
        self.check_versions().await;

        if let Err(step) = self.bootstrap(dir, &mut report).await {
            return self.abort(report, step).await;
        }

        let catalog = PolicyCatalog::from_config(cp, &self.config);
        let catalog = &catalog;
        let groups = match retry_with_backoff(&self.retry, "read policy catalog", move || {
            catalog.list_groups()
        })
        .await
        {
            Ok(groups) => groups,
            Err(e) => {
                error!(error = %e, "policy catalog unavailable, aborting pass");
                report.step_failed("read policy catalog", Some(private), e.to_string());
                return self.abort(report, "read policy catalog").await;
            }
        };
        report.step_ok("read policy catalog", Some(private));
        for group in groups.values() {
            info!(group = %group.key, labels = ?group.labels, "policy group");
        }

        ReconciliationDriver::new(cp, &self.config, &self.retry, dir)
            .run(&groups, &mut report)
            .await;

        self.legacy_side(LegacyOp::Deploy, dir, &mut report).await;

        info!(status = ?report.status(), summary = %report.summary(), "apply pass finished");
        report
    }

    /// Log the cluster version of each context, public first. Diagnostic only:
    /// an unreachable context here does not fail the pass.
    async fn check_versions(&self) {
        let cp = self.control_plane.as_ref();
        for context in [Context::Public, Context::Private] {
            let name = context.name(&self.config.contexts);
            match cp.version(name).await {
                Ok(version) => info!(context = %name, version = %version.trim(), "cluster version"),
                Err(e) => warn!(context = %name, error = %e, "cluster version unavailable"),
            }
        }
    }

    /// Replace the policy set in the private context. Returns the failed step.
    async fn bootstrap(
        &self,
        dir: &Path,
        report: &mut PassReport,
    ) -> std::result::Result<(), &'static str> {
        let cp = self.control_plane.as_ref();
        let private = self.config.contexts.private.as_str();
        let kind = self.config.policy_kind.as_str();
        let namespaces = paths::namespaces_path(dir);
        let crd = paths::policy_crd_path(dir);
        let definitions = paths::policy_definitions_path(dir);
        let (namespaces, crd, definitions) =
            (namespaces.as_path(), crd.as_path(), definitions.as_path());

        let result = self.step("apply namespaces", move || cp.apply_dir(private, namespaces)).await;
        self.require(report, "apply namespaces", private, result)?;
        let result = self
            .step("apply policy crd", move || cp.apply_server_side(private, crd))
            .await;
        self.require(report, "apply policy crd", private, result)?;
        let result = self.step("delete policies", move || cp.delete_all(private, kind)).await;
        self.require(report, "delete policies", private, result)?;
        let result = self
            .step("apply policy definitions", move || {
                cp.apply_dir(private, definitions)
            })
            .await;
        self.require(report, "apply policy definitions", private, result)?;
        Ok(())
    }

    /// Tear down cluster objects in both contexts and terminate legacy workloads.
    pub async fn delete(&self, dir: &Path) -> PassReport {
        let mut report = PassReport::new(PassKind::Delete);
        let cp = self.control_plane.as_ref();
        let contexts = &self.config.contexts;
        info!(dir = %dir.display(), "delete pass started");

        let apps = paths::apps_path(dir);
        for context in Context::all() {
            let name = context.name(contexts);
            let apps = apps.as_path();
            let result = self.step("delete apps", move || cp.delete_dir(name, apps)).await;
            self.record(&mut report, "delete apps", Some(name), result);
        }

        let private = contexts.private.as_str();
        for (step, path) in [
            ("delete policies", paths::policies_path(dir)),
            ("delete namespaces", paths::namespaces_path(dir)),
        ] {
            let path = path.as_path();
            let result = self.step(step, move || cp.delete_dir(private, path)).await;
            self.record(&mut report, step, Some(private), result);
        }

        self.legacy_side(LegacyOp::Terminate, dir, &mut report).await;
        reset_context(cp, &self.config, &self.retry, &mut report).await;

        info!(status = ?report.status(), summary = %report.summary(), "delete pass finished");
        report
    }

    /// Render the legacy-labelled workloads and run `op` on each.
    async fn legacy_side(&self, op: LegacyOp, dir: &Path, report: &mut PassReport) {
        let cp = self.control_plane.as_ref();
        let private = self.config.contexts.private.as_str();
        let apps = paths::apps_path(dir);
        let apps = apps.as_path();
        let selector = selector::legacy(&self.config.labels);
        let sel = &selector;

        let rendered = self
            .step("render legacy workloads", move || cp.render(private, apps, sel))
            .await;
        let manifests = rendered.and_then(|bytes| manifest::split(&bytes));
        match manifests {
            Ok(manifests) => {
                report.step_ok("render legacy workloads", Some(private));
                info!(op = %op, workloads = manifests.len(), "legacy workloads rendered");
                let outcomes = self.legacy.run_all(op, manifests).await;
                report.legacy.extend(outcomes);
            }
            Err(e) => {
                warn!(op = %op, error = %e, "legacy rendering failed, skipping legacy side");
                report.step_failed("render legacy workloads", Some(private), e.to_string());
            }
        }
    }

    async fn step<F, Fut, T>(&self, name: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        retry_with_backoff(&self.retry, name, operation).await
    }

    /// Record a step result; returns whether it succeeded.
    fn record(
        &self,
        report: &mut PassReport,
        step: &str,
        context: Option<&str>,
        result: Result<()>,
    ) -> bool {
        match result {
            Ok(()) => {
                info!(step, context = context.unwrap_or("-"), "step done");
                report.step_ok(step, context);
                true
            }
            Err(e) => {
                error!(step, context = context.unwrap_or("-"), error = %e, "step failed");
                report.step_failed(step, context, e.to_string());
                false
            }
        }
    }

    fn require(
        &self,
        report: &mut PassReport,
        step: &'static str,
        context: &str,
        result: Result<()>,
    ) -> std::result::Result<(), &'static str> {
        if self.record(report, step, Some(context), result) {
            Ok(())
        } else {
            Err(step)
        }
    }

    async fn abort(&self, mut report: PassReport, step: &str) -> PassReport {
        report.aborted = Some(format!("{step} failed"));
        warn!(step, "pass aborted before reconciliation");
        reset_context(self.control_plane.as_ref(), &self.config, &self.retry, &mut report).await;
        report
    }
}
