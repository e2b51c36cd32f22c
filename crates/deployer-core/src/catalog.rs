//! Placement policy catalog.
//!
//! Policy objects live in the private context. Each is tagged with a group
//! label and lists the placement labels it grants in `spec.labels`; the labels
//! of all policies sharing a group are unioned.

use crate::config::Config;
use crate::config::LabelScheme;
use crate::control_plane::ControlPlane;
use crate::error::{DeployerError, Result};
use crate::types::WorkloadGroup;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Workload groups keyed (and therefore ordered) by group key.
pub type Groups = BTreeMap<String, WorkloadGroup>;

pub struct PolicyCatalog<'a> {
    control_plane: &'a dyn ControlPlane,
    context: &'a str,
    kind: &'a str,
    scheme: &'a LabelScheme,
}

impl<'a> PolicyCatalog<'a> {
    pub fn new(
        control_plane: &'a dyn ControlPlane,
        context: &'a str,
        kind: &'a str,
        scheme: &'a LabelScheme,
    ) -> Self {
        Self {
            control_plane,
            context,
            kind,
            scheme,
        }
    }

    /// Catalog reading `config.policy_kind` from the private context.
    pub fn from_config(control_plane: &'a dyn ControlPlane, config: &'a Config) -> Self {
        Self::new(
            control_plane,
            &config.contexts.private,
            &config.policy_kind,
            &config.labels,
        )
    }

    /// Read every policy object and group them. Any failure to obtain the
    /// listing is returned as is; there is no partial catalog.
    pub async fn list_groups(&self) -> Result<Groups> {
        let output = self
            .control_plane
            .query(self.context, self.kind, None)
            .await?;
        let groups = parse_groups(&output, self.scheme)?;
        debug!(context = %self.context, groups = groups.len(), "policy catalog read");
        Ok(groups)
    }
}

#[derive(Deserialize)]
struct PolicyList {
    #[serde(default)]
    items: Vec<Value>,
}

/// Parse a `get <kind> -A -o json` listing into groups.
///
/// A policy whose labels cannot be read still registers its group, with no
/// labels contributed. A policy without a group label is skipped.
pub fn parse_groups(output: &str, scheme: &LabelScheme) -> Result<Groups> {
    let mut groups = Groups::new();
    if output.trim().is_empty() {
        return Ok(groups);
    }

    let list: PolicyList = serde_json::from_str(output)
        .map_err(|e| DeployerError::InvalidControlPlaneOutput(format!("policy listing: {e}")))?;

    for item in &list.items {
        let name = policy_name(item);
        let Some(key) = item
            .pointer("/metadata/labels")
            .and_then(|labels| labels.get(&scheme.group))
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
        else {
            warn!(policy = %name, label = %scheme.group, "policy has no group label, skipping");
            continue;
        };

        let group = groups
            .entry(key.to_string())
            .or_insert_with(|| WorkloadGroup::new(key));

        match policy_labels(item, &name) {
            Ok(labels) => group.labels.extend(labels),
            Err(e) => warn!(group = %key, error = %e, "policy contributes no labels"),
        }
    }

    Ok(groups)
}

fn policy_name(item: &Value) -> String {
    let name = item
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>");
    match item.pointer("/metadata/namespace").and_then(Value::as_str) {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    }
}

fn policy_labels(item: &Value, name: &str) -> Result<Vec<String>> {
    let malformed = |reason: &str| DeployerError::MalformedPolicyData {
        policy: name.to_string(),
        reason: reason.to_string(),
    };

    match item.pointer("/spec/labels") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("spec.labels contains a non-string entry"))
            })
            .collect(),
        Some(_) => Err(malformed("spec.labels must be a list of strings")),
    }
}
