use crate::config::{ContextsConfig, LabelScheme};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// One of the two independently managed cluster targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    Private,
    Public,
}

impl Context {
    pub fn all() -> &'static [Context] {
        &[Context::Private, Context::Public]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Private => "private",
            Context::Public => "public",
        }
    }

    /// The kubeconfig context name this target resolves to.
    pub fn name<'a>(&self, contexts: &'a ContextsConfig) -> &'a str {
        match self {
            Context::Private => &contexts.private,
            Context::Public => &contexts.public,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PlacementLabel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementLabel {
    PrivateSupported,
    PublicSupported,
}

impl PlacementLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementLabel::PrivateSupported => "private-supported",
            PlacementLabel::PublicSupported => "public-supported",
        }
    }

    /// Interpret one raw policy label.
    ///
    /// Accepts the bare support key (`cloud-minikube`) as well as
    /// `cloud-minikube=supported` and `cloud-minikube==supported`. Anything
    /// else is not a placement label.
    pub fn parse(raw: &str, scheme: &LabelScheme) -> Option<Self> {
        let raw = raw.trim();
        let key = match raw.split_once("==").or_else(|| raw.split_once('=')) {
            Some((key, value)) if value.trim() == scheme.supported_value => key.trim(),
            Some(_) => return None,
            None => raw,
        };
        if key == scheme.private {
            Some(PlacementLabel::PrivateSupported)
        } else if key == scheme.public {
            Some(PlacementLabel::PublicSupported)
        } else {
            None
        }
    }
}

impl fmt::Display for PlacementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkloadGroup
// ---------------------------------------------------------------------------

/// A named set of workloads sharing a placement policy.
///
/// `labels` is the union of the raw labels declared by every policy object
/// tagged with `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadGroup {
    pub key: String,
    pub labels: BTreeSet<String>,
}

impl WorkloadGroup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            labels: BTreeSet::new(),
        }
    }

    pub fn with_labels<I, S>(key: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn placement_labels(&self, scheme: &LabelScheme) -> BTreeSet<PlacementLabel> {
        self.labels
            .iter()
            .filter_map(|l| PlacementLabel::parse(l, scheme))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Apply,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Apply => "apply",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One context-scoped mutation emitted by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub context: Context,
    pub verb: Verb,
    pub scope: Selector,
}

impl Action {
    pub fn apply(context: Context, scope: Selector) -> Self {
        Self {
            context,
            verb: Verb::Apply,
            scope,
        }
    }

    pub fn delete(context: Context, scope: Selector) -> Self {
        Self {
            context,
            verb: Verb::Delete,
            scope,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -l {}", self.context, self.verb, self.scope)
    }
}
