//! Rule table configuration as it appears in `curator.toml`.
//!
//! ```toml
//! [[curator.rules]]
//! days = { from = 10 }
//! allocation = { exclude = { tag = "realtime" }, total_shards_per_node = -1 }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shard allocation filter: node attribute name to value. An empty value
/// clears a previously set constraint on the cluster.
pub type TagFilter = BTreeMap<String, String>;

/// Age window in whole days. A missing bound is unbounded on that side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default)]
    pub include: TagFilter,
    #[serde(default)]
    pub exclude: TagFilter,
    #[serde(default)]
    pub require: TagFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_shards_per_node: Option<i64>,
}

/// One entry of the rule table. At most one of `allocation`, `close` and
/// `delete` may be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub days: DayWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationConfig>,
    #[serde(default)]
    pub close: bool,
    #[serde(default)]
    pub delete: bool,
}

fn tag(value: &str) -> TagFilter {
    TagFilter::from([("tag".to_string(), value.to_string())])
}

/// Hot tier for the first ten days, then moved off `realtime` nodes.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            days: DayWindow {
                from: Some(0),
                to: Some(10),
            },
            allocation: Some(AllocationConfig {
                include: tag(""),
                exclude: tag(""),
                require: tag(""),
                total_shards_per_node: Some(3),
            }),
            ..Default::default()
        },
        RuleConfig {
            days: DayWindow {
                from: Some(10),
                to: None,
            },
            allocation: Some(AllocationConfig {
                include: tag(""),
                exclude: tag("realtime"),
                require: tag(""),
                total_shards_per_node: Some(-1),
            }),
            ..Default::default()
        },
    ]
}
