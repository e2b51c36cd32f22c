use std::path::{Path, PathBuf};

use deployer_core::catalog::Groups;
use deployer_core::config::Config;
use deployer_core::control_plane::ControlPlane;
use deployer_core::paths;
use deployer_core::planner::plan_group;
use deployer_core::report::{FailedAction, GroupOutcome, PassReport};
use deployer_core::types::{Action, Context, Verb, WorkloadGroup};
use deployer_core::Result;
use tracing::{debug, error, info, warn};

use crate::retry::{retry_with_backoff, RetryPolicy};

/// Executes each group's planned actions against the `apps/` manifests.
///
/// Within a group, actions run strictly in plan order and the first failure
/// halts the rest of that group. Groups are independent of each other.
pub struct ReconciliationDriver<'a> {
    control_plane: &'a dyn ControlPlane,
    config: &'a Config,
    retry: &'a RetryPolicy,
    apps: PathBuf,
}

impl<'a> ReconciliationDriver<'a> {
    pub fn new(
        control_plane: &'a dyn ControlPlane,
        config: &'a Config,
        retry: &'a RetryPolicy,
        dir: &Path,
    ) -> Self {
        Self {
            control_plane,
            config,
            retry,
            apps: paths::apps_path(dir),
        }
    }

    /// Reconcile every group, then reset the active context to private.
    pub async fn run(&self, groups: &Groups, report: &mut PassReport) {
        let mut active: Option<Context> = None;
        for group in groups.values() {
            let outcome = self.run_group(group, &mut active).await;
            report.groups.push(outcome);
        }
        reset_context(self.control_plane, self.config, self.retry, report).await;
    }

    async fn run_group(&self, group: &WorkloadGroup, active: &mut Option<Context>) -> GroupOutcome {
        let plan = plan_group(group, &self.config.labels);
        info!(
            group = %plan.group,
            decision = %plan.decision,
            actions = plan.actions.len(),
            "reconciling group"
        );

        let planned = plan.actions.len();
        let mut executed = 0;
        let mut failed = None;

        for action in plan.actions {
            if *active != Some(action.context) {
                info!(
                    group = %plan.group,
                    context = %action.context.name(&self.config.contexts),
                    "switching context"
                );
                *active = Some(action.context);
            }

            match self.execute(&plan.group, &action).await {
                Ok(()) => executed += 1,
                Err(e) => {
                    error!(
                        group = %plan.group,
                        context = %action.context.name(&self.config.contexts),
                        verb = %action.verb,
                        selector = %action.scope,
                        error = %e,
                        "action failed, halting group"
                    );
                    failed = Some(FailedAction {
                        action,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        GroupOutcome {
            group: plan.group,
            decision: plan.decision,
            planned,
            executed,
            failed,
        }
    }

    async fn execute(&self, group: &str, action: &Action) -> Result<()> {
        let context = action.context.name(&self.config.contexts);
        debug!(
            group = %group,
            context = %context,
            verb = %action.verb,
            selector = %action.scope,
            "executing action"
        );

        let control_plane = self.control_plane;
        let apps = self.apps.as_path();
        let scope = &action.scope;
        let verb = action.verb;
        let operation = format!("{group}: {action}");

        retry_with_backoff(self.retry, &operation, move || async move {
            match verb {
                Verb::Apply => control_plane.apply(context, apps, scope).await,
                Verb::Delete => control_plane.delete(context, apps, scope).await,
            }
        })
        .await
    }
}

/// Make the private context active again and record the outcome.
pub(crate) async fn reset_context(
    control_plane: &dyn ControlPlane,
    config: &Config,
    retry: &RetryPolicy,
    report: &mut PassReport,
) {
    let private = config.contexts.private.as_str();
    match retry_with_backoff(retry, "reset context", move || control_plane.set_context(private)).await {
        Ok(()) => {
            info!(context = %private, "active context reset");
            report.step_ok("reset context", Some(private));
        }
        Err(e) => {
            warn!(context = %private, error = %e, "failed to reset active context");
            report.step_failed("reset context", Some(private), e.to_string());
        }
    }
}
