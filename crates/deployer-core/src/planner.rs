//! Four-state placement planner.
//!
//! The decision is recomputed from the current labels on every run; nothing
//! about a previous run is consulted. Each context a group is entitled to gets
//! `apply(include)` followed by `delete(exclude)`, which cleans up objects whose
//! labels changed since they were last applied. A context the group is not
//! entitled to gets a single unconditional group-scope delete.

use crate::config::LabelScheme;
use crate::selector::{self, SelectorSet};
use crate::types::{Action, Context, PlacementLabel, WorkloadGroup};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementDecision {
    Both,
    PrivateOnly,
    PublicOnly,
    None,
}

impl PlacementDecision {
    pub fn from_flags(private: bool, public: bool) -> Self {
        match (private, public) {
            (true, true) => Self::Both,
            (true, false) => Self::PrivateOnly,
            (false, true) => Self::PublicOnly,
            (false, false) => Self::None,
        }
    }

    pub fn from_labels(labels: &BTreeSet<PlacementLabel>) -> Self {
        Self::from_flags(
            labels.contains(&PlacementLabel::PrivateSupported),
            labels.contains(&PlacementLabel::PublicSupported),
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::PrivateOnly => "private_only",
            Self::PublicOnly => "public_only",
            Self::None => "none",
        }
    }

    /// Whether workloads of the group may run in `context`.
    pub fn entitles(&self, context: Context) -> bool {
        matches!(
            (self, context),
            (Self::Both, _)
                | (Self::PrivateOnly, Context::Private)
                | (Self::PublicOnly, Context::Public)
        )
    }
}

impl fmt::Display for PlacementDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn decide(group: &WorkloadGroup, scheme: &LabelScheme) -> PlacementDecision {
    PlacementDecision::from_labels(&group.placement_labels(scheme))
}

/// Emit the ordered action list for `decision`.
///
/// Contexts the group is entitled to come first.
pub fn plan(decision: PlacementDecision, selectors: &SelectorSet) -> Vec<Action> {
    let entitled = |context: Context| -> Vec<Action> {
        let (include, exclude) = match context {
            Context::Private => (&selectors.include_private, &selectors.exclude_private),
            Context::Public => (&selectors.include_public, &selectors.exclude_public),
        };
        vec![
            Action::apply(context, include.clone()),
            Action::delete(context, exclude.clone()),
        ]
    };
    let revoked = |context: Context| Action::delete(context, selectors.group_scope.clone());

    match decision {
        PlacementDecision::Both => {
            let mut actions = entitled(Context::Private);
            actions.extend(entitled(Context::Public));
            actions
        }
        PlacementDecision::PrivateOnly => {
            let mut actions = entitled(Context::Private);
            actions.push(revoked(Context::Public));
            actions
        }
        PlacementDecision::PublicOnly => {
            let mut actions = entitled(Context::Public);
            actions.push(revoked(Context::Private));
            actions
        }
        PlacementDecision::None => vec![revoked(Context::Private), revoked(Context::Public)],
    }
}

/// The full plan for one group, as shown by `deployer plan`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPlan {
    pub group: String,
    pub decision: PlacementDecision,
    pub actions: Vec<Action>,
}

pub fn plan_group(group: &WorkloadGroup, scheme: &LabelScheme) -> GroupPlan {
    let decision = decide(group, scheme);
    let selectors = selector::build(group, scheme);
    GroupPlan {
        group: group.key.clone(),
        decision,
        actions: plan(decision, &selectors),
    }
}
