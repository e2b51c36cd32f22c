//! In-memory control plane for driver and pass tests.
//!
//! Models the workload objects defined under `apps/` and the live objects in
//! each context, and records every call with the context it named.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use deployer_core::control_plane::ControlPlane;
use deployer_core::paths::APPS_DIR;
use deployer_core::selector::Selector;
use deployer_core::{DeployerError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    /// `None` for `set_context`, which names no target context.
    pub context: Option<String>,
    pub op: &'static str,
    pub selector: Option<String>,
}

#[derive(Debug, Clone)]
struct Object {
    name: String,
    labels: BTreeMap<String, String>,
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send + Sync>;

#[derive(Default)]
struct Cluster {
    live: BTreeMap<String, BTreeMap<String, Object>>,
    calls: Vec<Call>,
    active: Option<String>,
    created: usize,
    removed: usize,
}

pub(crate) struct FakeCluster {
    manifests: Vec<Object>,
    policies: Option<String>,
    rendered: Vec<u8>,
    fail_when: Option<FailWhen>,
    state: Mutex<Cluster>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            manifests: Vec::new(),
            policies: Some(policy_listing(&[])),
            rendered: Vec::new(),
            fail_when: None,
            state: Mutex::new(Cluster::default()),
        }
    }

    /// Add a manifest under `apps/`.
    pub fn with_workload(mut self, name: &str, labels: &[(&str, &str)]) -> Self {
        self.manifests.push(Object {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    /// Policy groups as `(group, labels)`.
    pub fn with_policies(mut self, groups: &[(&str, &[&str])]) -> Self {
        self.policies = Some(policy_listing(groups));
        self
    }

    /// Make the policy listing fail as if kubectl could not reach the cluster.
    pub fn with_unreachable_catalog(mut self) -> Self {
        self.policies = None;
        self
    }

    pub fn with_rendered(mut self, rendered: impl Into<Vec<u8>>) -> Self {
        self.rendered = rendered.into();
        self
    }

    pub fn failing(mut self, pred: impl Fn(&Call) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(pred));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Names of the live objects in `context`, sorted.
    pub fn live(&self, context: &str) -> Vec<String> {
        self.lock()
            .live
            .get(context)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn active(&self) -> Option<String> {
        self.lock().active.clone()
    }

    /// `(created, removed)` since the last [`reset_counters`](Self::reset_counters).
    pub fn counters(&self) -> (usize, usize) {
        let state = self.lock();
        (state.created, state.removed)
    }

    pub fn reset_counters(&self) {
        let mut state = self.lock();
        state.created = 0;
        state.removed = 0;
        state.calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cluster> {
        self.state.lock().unwrap()
    }

    fn record(&self, context: Option<&str>, op: &'static str, selector: Option<&Selector>) -> Result<()> {
        let call = Call {
            context: context.map(str::to_string),
            op,
            selector: selector.map(Selector::to_string),
        };
        let fail = self.fail_when.as_ref().is_some_and(|f| f(&call));
        self.lock().calls.push(call);
        if fail {
            return Err(DeployerError::ControlPlaneUnavailable {
                command: format!("kubectl {op}"),
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn is_apps(path: &Path) -> bool {
        path.file_name().is_some_and(|n| n == APPS_DIR)
    }

    fn apply_matching(&self, context: &str, selector: Option<&Selector>) {
        let mut state = self.lock();
        let mut created = 0;
        let live = state.live.entry(context.to_string()).or_default();
        for object in &self.manifests {
            if selector.is_some_and(|s| !s.matches(&object.labels)) {
                continue;
            }
            if !live.contains_key(&object.name) {
                live.insert(object.name.clone(), object.clone());
                created += 1;
            }
        }
        state.created += created;
    }

    fn delete_matching(&self, context: &str, selector: Option<&Selector>) {
        let mut state = self.lock();
        let Some(live) = state.live.get_mut(context) else {
            return;
        };
        let before = live.len();
        live.retain(|_, object| selector.is_some_and(|s| !s.matches(&object.labels)));
        let removed = before - live.len();
        state.removed += removed;
    }
}

#[async_trait]
impl ControlPlane for FakeCluster {
    async fn set_context(&self, context: &str) -> Result<()> {
        self.record(None, "use-context", None)?;
        self.lock().active = Some(context.to_string());
        Ok(())
    }

    async fn query(&self, context: &str, _kind: &str, selector: Option<&Selector>) -> Result<String> {
        self.record(Some(context), "get", selector)?;
        self.policies
            .clone()
            .ok_or_else(|| DeployerError::ControlPlaneUnavailable {
                command: "kubectl get cpol".into(),
                reason: "Unable to connect to the server".into(),
            })
    }

    async fn version(&self, context: &str) -> Result<String> {
        self.record(Some(context), "version", None)?;
        Ok(format!("{{\"serverVersion\":{{\"gitVersion\":\"v1.29.0-{context}\"}}}}"))
    }

    async fn apply(&self, context: &str, path: &Path, selector: &Selector) -> Result<()> {
        self.record(Some(context), "apply", Some(selector))?;
        if Self::is_apps(path) {
            self.apply_matching(context, Some(selector));
        }
        Ok(())
    }

    async fn delete(&self, context: &str, path: &Path, selector: &Selector) -> Result<()> {
        self.record(Some(context), "delete", Some(selector))?;
        if Self::is_apps(path) {
            self.delete_matching(context, Some(selector));
        }
        Ok(())
    }

    async fn apply_dir(&self, context: &str, path: &Path) -> Result<()> {
        self.record(Some(context), "apply-dir", None)?;
        if Self::is_apps(path) {
            self.apply_matching(context, None);
        }
        Ok(())
    }

    async fn delete_dir(&self, context: &str, path: &Path) -> Result<()> {
        self.record(Some(context), "delete-dir", None)?;
        if Self::is_apps(path) {
            self.delete_matching(context, None);
        }
        Ok(())
    }

    async fn apply_server_side(&self, context: &str, _path: &Path) -> Result<()> {
        self.record(Some(context), "apply-server-side", None)
    }

    async fn delete_all(&self, context: &str, _kind: &str) -> Result<()> {
        self.record(Some(context), "delete-all", None)
    }

    async fn render(&self, context: &str, _path: &Path, selector: &Selector) -> Result<Vec<u8>> {
        self.record(Some(context), "render", Some(selector))?;
        Ok(self.rendered.clone())
    }
}

/// A `get cpol -A -o json` listing with one policy per group.
pub(crate) fn policy_listing(groups: &[(&str, &[&str])]) -> String {
    let items: Vec<_> = groups
        .iter()
        .map(|(group, labels)| {
            serde_json::json!({
                "kind": "CloudPolicy",
                "metadata": {
                    "name": format!("{group}-policy"),
                    "namespace": "policies",
                    "labels": { "cloud-group": group },
                },
                "spec": { "labels": labels },
            })
        })
        .collect();
    serde_json::json!({ "apiVersion": "v1", "kind": "List", "items": items }).to_string()
}
