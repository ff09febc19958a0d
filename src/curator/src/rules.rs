//! Rule table and age matching.
//!
//! Rules are evaluated in table order and the last rule whose day window
//! contains the index age wins, so a later, more specific rule overrides an
//! earlier broad one.

use common::config::{AllocationConfig, RuleConfig, TagFilter};
use serde::Serialize;
use thiserror::Error;

/// Shard allocation settings applied to an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationPolicy {
    pub include: TagFilter,
    pub exclude: TagFilter,
    pub require: TagFilter,
    pub total_shards_per_node: Option<i64>,
}

impl From<&AllocationConfig> for AllocationPolicy {
    fn from(config: &AllocationConfig) -> Self {
        Self {
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            require: config.require.clone(),
            total_shards_per_node: config.total_shards_per_node,
        }
    }
}

impl AllocationPolicy {
    fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.require.is_empty()
            && self.total_shards_per_node.is_none()
    }
}

/// What a rule asks for, before the index state is taken into account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Allocate(AllocationPolicy),
    Close,
    Delete,
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionRule {
    pub days_from: Option<i64>,
    pub days_to: Option<i64>,
    pub action: RuleAction,
}

impl RetentionRule {
    /// `[days_from, days_to)`, with a missing bound left open. A zero lower
    /// bound is no bound at all, so future-dated indices (negative age) still
    /// fall into the first tier.
    pub fn matches(&self, age_days: i64) -> bool {
        self.days_from
            .is_none_or(|from| from == 0 || age_days >= from)
            && self.days_to.is_none_or(|to| age_days < to)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleConfigError {
    #[error("rule {position}: day window [{from}, {to}) is empty")]
    EmptyWindow { position: usize, from: i64, to: i64 },

    #[error("rule {position}: only one of allocation, close and delete may be set")]
    ConflictingActions { position: usize },

    #[error("rule {position}: allocation sets no filter and no shard cap")]
    EmptyAllocation { position: usize },
}

/// Ordered, read-only rule table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<RetentionRule>,
}

impl RuleTable {
    /// Compile and validate the configured rules. Positions in errors are 1-based.
    pub fn from_config(configs: &[RuleConfig]) -> Result<Self, RuleConfigError> {
        let mut rules = Vec::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            let position = index + 1;

            if let (Some(from), Some(to)) = (config.days.from, config.days.to) {
                if from >= to {
                    return Err(RuleConfigError::EmptyWindow { position, from, to });
                }
            }

            let selected = [config.allocation.is_some(), config.close, config.delete]
                .into_iter()
                .filter(|set| *set)
                .count();
            if selected > 1 {
                return Err(RuleConfigError::ConflictingActions { position });
            }

            let action = if config.close {
                RuleAction::Close
            } else if config.delete {
                RuleAction::Delete
            } else if let Some(allocation) = &config.allocation {
                let policy = AllocationPolicy::from(allocation);
                if policy.is_empty() {
                    return Err(RuleConfigError::EmptyAllocation { position });
                }
                RuleAction::Allocate(policy)
            } else {
                RuleAction::Nothing
            };

            rules.push(RetentionRule {
                days_from: config.days.from,
                days_to: config.days.to,
                action,
            });
        }

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[RetentionRule] {
        &self.rules
    }

    /// The last rule whose window contains `age_days`
    pub fn matching(&self, age_days: i64) -> Option<&RetentionRule> {
        self.rules.iter().rev().find(|rule| rule.matches(age_days))
    }
}
