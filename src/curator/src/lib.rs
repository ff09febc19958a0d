//! Index Curator Library
//!
//! Age-based lifecycle management for date-stamped indices in a search
//! cluster. Each index found in the cluster listing is classified by age
//! against an ordered rule table and receives at most one action: a shard
//! allocation change, a close, or a delete. Actions are executed strictly one
//! at a time; a failing index never stops the run.
//!
//! - `parser`: extracts `prefix-YYYY.MM.DD` indices from the listing
//! - `rules`: the rule table and last-match-wins age matching
//! - `planner`: resolves matched rules into idempotent operations
//! - `executor`: sequential execution with per-task failure isolation
//! - `sink`: log sinks receiving run events
//! - `run`: ties the pieces together for one run

pub mod cluster;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod parser;
pub mod planner;
pub mod rules;
pub mod run;
pub mod sink;

// Re-export commonly used types
pub use cluster::{ClusterOps, IndexLister};
pub use error::{CuratorError, OperationError};
pub use executor::{ExecutorConfig, SequentialExecutor, TaskOutcome, TaskStatus};
pub use metrics::{CuratorMetrics, MetricsSummary};
pub use parser::{IndexDescriptor, IndexLineParser, ParseError};
pub use planner::{Action, PlannedTask, SkipReason, plan_action, plan_tasks};
pub use rules::{AllocationPolicy, RetentionRule, RuleAction, RuleConfigError, RuleTable};
pub use run::{Curator, Plan, RunSummary};
pub use sink::{CompositeSink, LogSink, RunEvent, TracingSink, TranscriptSink};
