//! One curator run: list, parse, match, plan, execute.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use common::config::CuratorConfig;
use serde::Serialize;

use crate::cluster::{ClusterOps, IndexLister};
use crate::error::{CuratorError, Result};
use crate::executor::{ExecutorConfig, SequentialExecutor, TaskOutcome, TaskStatus};
use crate::metrics::CuratorMetrics;
use crate::parser::IndexLineParser;
use crate::planner::{PlannedTask, plan_tasks};
use crate::rules::RuleTable;
use crate::sink::{LogSink, RunEvent};

/// Tasks computed for a run, before execution
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub today: NaiveDate,
    /// Indices reported by the cluster, date-stamped or not
    pub indices_found: usize,
    pub parse_errors: usize,
    pub tasks: Vec<PlannedTask>,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub today: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub indices_found: usize,
    pub parse_errors: usize,
    pub outcomes: Vec<TaskOutcome>,
}

impl RunSummary {
    fn count(&self, status: TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(TaskStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TaskStatus::Skipped)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Applies the rule table to the indices of one cluster
pub struct Curator {
    lister: Arc<dyn IndexLister>,
    cluster: Arc<dyn ClusterOps>,
    parser: IndexLineParser,
    rules: RuleTable,
    executor: SequentialExecutor,
}

impl Curator {
    /// Build a curator from configuration, validating the rule table
    pub fn new(
        lister: Arc<dyn IndexLister>,
        cluster: Arc<dyn ClusterOps>,
        config: &CuratorConfig,
        metrics: CuratorMetrics,
    ) -> Result<Self> {
        let parser =
            IndexLineParser::new(&config.index_prefix).map_err(|source| {
                CuratorError::IndexPrefix {
                    prefix: config.index_prefix.clone(),
                    source,
                }
            })?;
        let rules = RuleTable::from_config(&config.rules)?;
        let executor = SequentialExecutor::new(ExecutorConfig::from(config), metrics);

        Ok(Self {
            lister,
            cluster,
            parser,
            rules,
            executor,
        })
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn metrics(&self) -> &CuratorMetrics {
        self.executor.metrics()
    }

    /// List and classify every index against `today`. A listing failure is
    /// fatal; unparsable names are reported and skipped.
    pub async fn plan(&self, today: NaiveDate, sink: &dyn LogSink) -> Result<Plan> {
        let listing = self
            .lister
            .list_indices()
            .await
            .map_err(CuratorError::Listing)?;

        let parsed = self.parser.parse_listing(&listing);
        sink.record(&RunEvent::IndicesFound {
            count: parsed.entries,
        });

        for error in &parsed.errors {
            sink.record(&RunEvent::ParseFailed {
                index: error.index().to_string(),
                error: error.to_string(),
            });
        }

        let parse_errors = parsed.errors.len();
        let tasks = plan_tasks(parsed.descriptors, &self.rules, today);

        tracing::debug!(
            today = %today,
            indices_found = parsed.entries,
            parse_errors,
            planned = tasks.len(),
            "Planned curator tasks"
        );

        Ok(Plan {
            today,
            indices_found: parsed.entries,
            parse_errors,
            tasks,
        })
    }

    /// Plan and execute all tasks. Returns once every task has finished.
    pub async fn run(&self, today: NaiveDate, sink: &dyn LogSink) -> Result<RunSummary> {
        let started_at = Utc::now();
        sink.record(&RunEvent::RunStarted {
            today,
            dry_run: self.executor.config().dry_run,
        });

        let plan = self.plan(today, sink).await?;
        let outcomes = self
            .executor
            .execute(self.cluster.as_ref(), sink, plan.tasks)
            .await;

        Ok(RunSummary {
            today,
            started_at,
            completed_at: Utc::now(),
            indices_found: plan.indices_found,
            parse_errors: plan.parse_errors,
            outcomes,
        })
    }
}
