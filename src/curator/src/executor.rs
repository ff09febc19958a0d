//! Sequential task execution
//!
//! Runs planned tasks strictly one at a time in index name order. Each
//! operation is awaited before the next one is dispatched, and a failed task
//! never stops the run.

use std::time::{Duration, Instant};

use cluster_client::IndexSettings;
use common::config::CuratorConfig;
use serde::Serialize;

use crate::cluster::ClusterOps;
use crate::error::OperationError;
use crate::metrics::CuratorMetrics;
use crate::planner::{Action, PlannedTask};
use crate::sink::{LogSink, RunEvent};

/// Configuration for task execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound for one cluster operation. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
    pub dry_run: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Some(Duration::from_secs(300)),
            dry_run: false,
        }
    }
}

impl From<&CuratorConfig> for ExecutorConfig {
    fn from(config: &CuratorConfig) -> Self {
        Self {
            operation_timeout: Some(config.operation_timeout),
            dry_run: config.dry_run,
        }
    }
}

/// Terminal state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
    /// Finished without contacting the cluster
    Skipped,
}

/// Result of executing one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub index: String,
    pub action: Action,
    pub status: TaskStatus,
    pub error: Option<String>,
    #[serde(skip)]
    pub duration: Duration,
}

/// Executes planned tasks one at a time
pub struct SequentialExecutor {
    config: ExecutorConfig,
    metrics: CuratorMetrics,
}

impl SequentialExecutor {
    pub fn new(config: ExecutorConfig, metrics: CuratorMetrics) -> Self {
        Self { config, metrics }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &CuratorMetrics {
        &self.metrics
    }

    /// Execute every task in ascending index name order.
    ///
    /// Returns one outcome per task, in execution order, once the whole
    /// sequence has drained. An empty task list completes immediately.
    pub async fn execute(
        &self,
        cluster: &dyn ClusterOps,
        sink: &dyn LogSink,
        mut tasks: Vec<PlannedTask>,
    ) -> Vec<TaskOutcome> {
        tasks.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));

        let total = tasks.len();
        let mut outcomes = Vec::with_capacity(total);

        for (position, task) in tasks.iter().enumerate() {
            let outcome = self.execute_task(cluster, sink, task).await;
            outcomes.push(outcome);

            let remaining = total - position - 1;
            if remaining > 0 {
                sink.record(&RunEvent::Progress { remaining });
            }
        }

        let count = |status: TaskStatus| outcomes.iter().filter(|o| o.status == status).count();
        sink.record(&RunEvent::RunCompleted {
            processed: outcomes.len(),
            succeeded: count(TaskStatus::Succeeded),
            failed: count(TaskStatus::Failed),
            skipped: count(TaskStatus::Skipped),
        });

        outcomes
    }

    async fn execute_task(
        &self,
        cluster: &dyn ClusterOps,
        sink: &dyn LogSink,
        task: &PlannedTask,
    ) -> TaskOutcome {
        let index = task.index().to_string();
        let action = task.action.clone();

        if let Action::None { reason } = &task.action {
            return self.skip(sink, index, action, &reason.to_string());
        }

        let settings = action.settings();
        sink.record(&RunEvent::TaskStarted {
            index: index.clone(),
            action: action.clone(),
            settings: settings.clone(),
            dry_run: self.config.dry_run,
        });

        if self.config.dry_run {
            return self.skip(sink, index, action, "dry run");
        }

        self.metrics.record_dispatch(&action);
        let started = Instant::now();
        let result = self
            .dispatch(cluster, &index, &action, settings.as_ref())
            .await;
        let duration = started.elapsed();

        match result {
            Ok(()) => {
                self.metrics.record_success(duration);
                sink.record(&RunEvent::TaskSucceeded {
                    index: index.clone(),
                    action: action.clone(),
                });
                TaskOutcome {
                    index,
                    action,
                    status: TaskStatus::Succeeded,
                    error: None,
                    duration,
                }
            }
            Err(e) => {
                if matches!(e, OperationError::Timeout(_)) {
                    self.metrics.record_timeout();
                }
                self.metrics.record_failure(duration);
                let error = e.to_string();
                sink.record(&RunEvent::TaskFailed {
                    index: index.clone(),
                    action: action.clone(),
                    settings,
                    error: error.clone(),
                });
                TaskOutcome {
                    index,
                    action,
                    status: TaskStatus::Failed,
                    error: Some(error),
                    duration,
                }
            }
        }
    }

    fn skip(&self, sink: &dyn LogSink, index: String, action: Action, reason: &str) -> TaskOutcome {
        self.metrics.record_skip();
        sink.record(&RunEvent::TaskSkipped {
            index: index.clone(),
            reason: reason.to_string(),
        });
        TaskOutcome {
            index,
            action,
            status: TaskStatus::Skipped,
            error: None,
            duration: Duration::ZERO,
        }
    }

    async fn dispatch(
        &self,
        cluster: &dyn ClusterOps,
        index: &str,
        action: &Action,
        settings: Option<&IndexSettings>,
    ) -> Result<(), OperationError> {
        let empty = IndexSettings::new();
        let operation = async {
            match action {
                Action::Reallocate(_) => {
                    cluster
                        .apply_settings(index, settings.unwrap_or(&empty))
                        .await
                }
                Action::Close => cluster.close(index).await,
                Action::Delete => cluster.delete(index).await,
                Action::None { .. } => Ok(()),
            }
        };

        match self.config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| OperationError::Timeout(limit))?
                .map_err(OperationError::from),
            None => operation.await.map_err(OperationError::from),
        }
    }
}
