//! Turns matched rules into concrete, idempotent cluster operations.

use std::fmt;

use chrono::NaiveDate;
use cluster_client::IndexSettings;
use serde::Serialize;
use serde_json::Value;

use crate::parser::IndexDescriptor;
use crate::rules::{AllocationPolicy, RetentionRule, RuleAction, RuleTable};

const ALLOCATION_SETTINGS_PREFIX: &str = "index.routing.allocation";

/// Why an index is left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Close rule on an index that is already closed
    AlreadyClosed,
    /// The matching rule carries no action
    NoActionRequired,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyClosed => write!(f, "already closed"),
            SkipReason::NoActionRequired => write!(f, "no action required"),
        }
    }
}

/// Operation to perform on one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Reallocate(AllocationPolicy),
    Close,
    Delete,
    None { reason: SkipReason },
}

impl Action {
    /// Flat settings payload for a reallocation. Close and delete carry none.
    pub fn settings(&self) -> Option<IndexSettings> {
        match self {
            Action::Reallocate(policy) => Some(allocation_settings(policy)),
            Action::Close | Action::Delete | Action::None { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Reallocate(_) => write!(f, "reallocate"),
            Action::Close => write!(f, "close"),
            Action::Delete => write!(f, "delete"),
            Action::None { .. } => write!(f, "none"),
        }
    }
}

/// `index.routing.allocation.<type>.<field>` for tag filters and
/// `index.routing.allocation.total_shards_per_node` for the cap. Empty filter
/// values are kept so the cluster clears earlier constraints.
pub fn allocation_settings(policy: &AllocationPolicy) -> IndexSettings {
    let mut settings = IndexSettings::new();

    for (rule_type, filter) in [
        ("include", &policy.include),
        ("exclude", &policy.exclude),
        ("require", &policy.require),
    ] {
        for (field, value) in filter {
            settings.insert(
                format!("{ALLOCATION_SETTINGS_PREFIX}.{rule_type}.{field}"),
                Value::String(value.clone()),
            );
        }
    }

    if let Some(cap) = policy.total_shards_per_node {
        settings.insert(
            format!("{ALLOCATION_SETTINGS_PREFIX}.total_shards_per_node"),
            Value::from(cap),
        );
    }

    settings
}

/// An index paired with the operation it will receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTask {
    pub descriptor: IndexDescriptor,
    pub age_days: i64,
    pub action: Action,
}

impl PlannedTask {
    pub fn index(&self) -> &str {
        &self.descriptor.name
    }
}

/// Resolve the action for a matched rule given the current index state
pub fn plan_action(rule: &RetentionRule, descriptor: &IndexDescriptor) -> Action {
    match &rule.action {
        RuleAction::Allocate(policy) => Action::Reallocate(policy.clone()),
        // Closing a closed index is a no-op
        RuleAction::Close if descriptor.is_closed => Action::None {
            reason: SkipReason::AlreadyClosed,
        },
        RuleAction::Close => Action::Close,
        RuleAction::Delete => Action::Delete,
        RuleAction::Nothing => Action::None {
            reason: SkipReason::NoActionRequired,
        },
    }
}

/// Match every descriptor against the rule table using a single `today`.
///
/// Indices without a matching rule get no task. The result is sorted by index
/// name and holds at most one task per name.
pub fn plan_tasks(
    descriptors: Vec<IndexDescriptor>,
    rules: &RuleTable,
    today: NaiveDate,
) -> Vec<PlannedTask> {
    let mut tasks: Vec<PlannedTask> = descriptors
        .into_iter()
        .filter_map(|descriptor| {
            let age_days = descriptor.age_days(today);
            match rules.matching(age_days) {
                Some(rule) => {
                    let action = plan_action(rule, &descriptor);
                    Some(PlannedTask {
                        descriptor,
                        age_days,
                        action,
                    })
                }
                None => {
                    tracing::debug!(
                        index = %descriptor.name,
                        age_days,
                        "No rule matched, skipping index"
                    );
                    None
                }
            }
        })
        .collect();

    tasks.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));
    tasks.dedup_by(|a, b| a.descriptor.name == b.descriptor.name);
    tasks
}
