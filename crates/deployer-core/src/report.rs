//! Outcome of one reconciliation pass.

use crate::planner::PlacementDecision;
use crate::run_log::{PassKind, RunStatus};
use crate::types::Action;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FailedAction {
    pub action: Action,
    pub error: String,
}

/// What happened to one workload group's action sequence.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    pub group: String,
    pub decision: PlacementDecision,
    pub planned: usize,
    pub executed: usize,
    /// The action that stopped the group; later actions were not attempted.
    pub failed: Option<FailedAction>,
}

impl GroupOutcome {
    pub fn succeeded(&self) -> bool {
        self.failed.is_none()
    }
}

/// What happened to one legacy workload.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyOutcome {
    /// Workload name, or the item index when the manifest had no usable name.
    pub workload: String,
    pub host: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl LegacyOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A cluster-side step outside the per-group plan (policy bootstrap,
/// directory deletes, legacy rendering).
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub context: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub kind: PassKind,
    pub steps: Vec<StepOutcome>,
    pub groups: Vec<GroupOutcome>,
    pub legacy: Vec<LegacyOutcome>,
    /// Set when the pass stopped before reconciling anything further.
    pub aborted: Option<String>,
    /// Revision the caller triggered the pass for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

impl PassReport {
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
            groups: Vec::new(),
            legacy: Vec::new(),
            aborted: None,
            rev: None,
        }
    }

    /// Tag the report with `rev`. An empty revision leaves it untagged.
    pub fn with_rev(mut self, rev: &str) -> Self {
        let rev = rev.trim();
        self.rev = (!rev.is_empty()).then(|| rev.to_string());
        self
    }

    pub fn step_ok(&mut self, step: impl Into<String>, context: Option<&str>) {
        self.steps.push(StepOutcome {
            step: step.into(),
            context: context.map(str::to_string),
            error: None,
        });
    }

    pub fn step_failed(&mut self, step: impl Into<String>, context: Option<&str>, error: String) {
        self.steps.push(StepOutcome {
            step: step.into(),
            context: context.map(str::to_string),
            error: Some(error),
        });
    }

    pub fn failure_count(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
            + self.groups.iter().filter(|g| !g.succeeded()).count()
            + self.legacy.iter().filter(|l| !l.succeeded()).count()
    }

    pub fn status(&self) -> RunStatus {
        if self.aborted.is_some() {
            RunStatus::Failed
        } else if self.failure_count() > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Succeeded
        }
    }

    /// One-line summary for logs and the run log.
    pub fn summary(&self) -> String {
        if let Some(reason) = &self.aborted {
            return format!("aborted: {reason}");
        }
        format!(
            "{} groups, {} legacy workloads, {} failures",
            self.groups.len(),
            self.legacy.len(),
            self.failure_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;
    use crate::types::Context;

    fn group(name: &str, failed: bool) -> GroupOutcome {
        GroupOutcome {
            group: name.into(),
            decision: PlacementDecision::Both,
            planned: 4,
            executed: if failed { 1 } else { 4 },
            failed: failed.then(|| FailedAction {
                action: Action::apply(Context::Public, Selector::new().equal("cloud-group", name)),
                error: "control plane unavailable".into(),
            }),
        }
    }

    #[test]
    fn clean_pass_succeeds() {
        let mut report = PassReport::new(PassKind::Apply);
        report.groups.push(group("web", false));
        report.step_ok("apply namespaces", Some("minikube"));
        assert_eq!(report.status(), RunStatus::Succeeded);
        assert_eq!(report.summary(), "1 groups, 0 legacy workloads, 0 failures");
    }

    #[test]
    fn one_failed_group_is_partial() {
        let mut report = PassReport::new(PassKind::Apply);
        report.groups.push(group("web", false));
        report.groups.push(group("batch", true));
        assert_eq!(report.status(), RunStatus::Partial);
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn failed_legacy_workload_is_partial() {
        let mut report = PassReport::new(PassKind::Delete);
        report.legacy.push(LegacyOutcome {
            workload: "billing".into(),
            host: None,
            status: None,
            error: Some("no routing annotation".into()),
        });
        assert_eq!(report.status(), RunStatus::Partial);
    }

    #[test]
    fn aborted_pass_fails() {
        let mut report = PassReport::new(PassKind::Apply);
        report.aborted = Some("policy catalog unavailable".into());
        assert_eq!(report.status(), RunStatus::Failed);
        assert!(report.summary().starts_with("aborted"));
    }

    #[test]
    fn rev_is_serialized_only_when_given() {
        let tagged = serde_json::to_value(PassReport::new(PassKind::Apply).with_rev("revTest2")).unwrap();
        assert_eq!(tagged["rev"], "revTest2");

        let untagged = serde_json::to_value(PassReport::new(PassKind::Apply).with_rev("")).unwrap();
        assert!(untagged.get("rev").is_none());
    }
}
