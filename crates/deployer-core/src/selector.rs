//! Label selectors and their per-group derivation.
//!
//! A [`Selector`] is a conjunction of `key==value` / `key!=value` requirements.
//! It renders to the control plane's `-l` syntax and can be evaluated locally
//! against a label map with the same semantics: `!=` also matches objects that
//! do not carry the key at all, which is what makes an include/exclude pair
//! partition any object set.

use crate::config::LabelScheme;
use crate::types::WorkloadGroup;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Eq,
    NotEq,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::NotEq => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub key: String,
    pub op: Op,
    pub value: String,
}

impl Requirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let actual = labels.get(&self.key);
        match self.op {
            Op::Eq => actual == Some(&self.value),
            Op::NotEq => actual != Some(&self.value),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, self.op.as_str(), self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.push(Requirement {
            key: key.into(),
            op: Op::Eq,
            value: value.into(),
        });
        self
    }

    pub fn not_equal(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.push(Requirement {
            key: key.into(),
            op: Op::NotEq,
            value: value.into(),
        });
        self
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Evaluate against an object's labels. An empty selector matches everything.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

// ---------------------------------------------------------------------------
// SelectorSet
// ---------------------------------------------------------------------------

/// The selectors derived for one workload group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorSet {
    pub include_private: Selector,
    pub exclude_private: Selector,
    pub include_public: Selector,
    pub exclude_public: Selector,
    /// Every object of the group regardless of placement labels.
    pub group_scope: Selector,
}

/// Derive the selectors for `group`.
///
/// The group's labels decide which selectors the planner uses, not their
/// shape, so the result only depends on the group key.
pub fn build(group: &WorkloadGroup, scheme: &LabelScheme) -> SelectorSet {
    let scope = Selector::new().equal(&scheme.group, &group.key);
    let supported = &scheme.supported_value;
    SelectorSet {
        include_private: scope.clone().equal(&scheme.private, supported),
        exclude_private: scope.clone().not_equal(&scheme.private, supported),
        include_public: scope.clone().equal(&scheme.public, supported),
        exclude_public: scope.clone().not_equal(&scheme.public, supported),
        group_scope: scope,
    }
}

/// Selects the workloads bridged to the legacy runtime.
pub fn legacy(scheme: &LabelScheme) -> Selector {
    Selector::new().equal(&scheme.legacy, &scheme.supported_value)
}
