//! Log sinks receiving the events of a curator run.
//!
//! The executor and the run orchestration never log directly; they emit
//! [`RunEvent`]s into an injected [`LogSink`]. [`TracingSink`] forwards them as
//! structured `tracing` events, [`TranscriptSink`] keeps the human-readable
//! lines and writes them to a file when the run has drained.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use cluster_client::IndexSettings;

use crate::planner::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunStarted {
        today: NaiveDate,
        dry_run: bool,
    },
    IndicesFound {
        count: usize,
    },
    ParseFailed {
        index: String,
        error: String,
    },
    TaskStarted {
        index: String,
        action: Action,
        settings: Option<IndexSettings>,
        dry_run: bool,
    },
    TaskSucceeded {
        index: String,
        action: Action,
    },
    TaskFailed {
        index: String,
        action: Action,
        settings: Option<IndexSettings>,
        error: String,
    },
    TaskSkipped {
        index: String,
        reason: String,
    },
    Progress {
        remaining: usize,
    },
    RunCompleted {
        processed: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

fn indices(count: usize) -> &'static str {
    if count == 1 { "index" } else { "indices" }
}

fn settings_json(settings: &IndexSettings) -> String {
    serde_json::to_string(settings).unwrap_or_else(|_| format!("{settings:?}"))
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::RunStarted { today, dry_run } => {
                write!(f, "Classifying indices relative to {today}")?;
                if *dry_run {
                    write!(f, " (dry run, no changes will be made)")?;
                }
                Ok(())
            }
            RunEvent::IndicesFound { count } => write!(f, "Found {count} {}", indices(*count)),
            RunEvent::ParseFailed { index, error } => {
                write!(f, "Skipping index {index}: {error}")
            }
            RunEvent::TaskStarted {
                index,
                action,
                settings,
                dry_run,
            } => {
                if *dry_run {
                    write!(f, "[dry run] ")?;
                }
                write!(f, "index: {index}, applying {action}")?;
                if let Some(settings) = settings {
                    write!(f, " with settings: {}", settings_json(settings))?;
                }
                Ok(())
            }
            RunEvent::TaskSucceeded { index, action } => {
                write!(f, "index: {index}, {action} succeeded")
            }
            RunEvent::TaskFailed {
                index,
                action,
                settings,
                error,
            } => {
                write!(f, "index: {index}, {action} failed: {error}")?;
                if let Some(settings) = settings {
                    write!(f, " (attempted settings: {})", settings_json(settings))?;
                }
                Ok(())
            }
            RunEvent::TaskSkipped { index, reason } => {
                write!(f, "index: {index}, nothing to do ({reason})")
            }
            RunEvent::Progress { remaining } => write!(
                f,
                "Update completed, {remaining} {} remaining, moving on to next...",
                indices(*remaining)
            ),
            RunEvent::RunCompleted {
                processed,
                succeeded,
                failed,
                skipped,
            } => write!(
                f,
                "All indices processed, finished. ({processed} processed: {succeeded} succeeded, {failed} failed, {skipped} skipped)"
            ),
        }
    }
}

/// Receiver of run events
pub trait LogSink: Send + Sync {
    fn record(&self, event: &RunEvent);
}

/// Emits every event as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { today, dry_run } => {
                tracing::info!(today = %today, dry_run, "Starting curator run");
            }
            RunEvent::IndicesFound { count } => {
                tracing::info!(count, "{event}");
            }
            RunEvent::ParseFailed { index, error } => {
                tracing::warn!(index = %index, error = %error, "Skipping index with unparsable date");
            }
            RunEvent::TaskStarted {
                index,
                action,
                settings,
                dry_run,
            } => {
                tracing::info!(
                    index = %index,
                    action = %action,
                    settings = ?settings,
                    dry_run,
                    "Dispatching index operation"
                );
            }
            RunEvent::TaskSucceeded { index, action } => {
                tracing::info!(index = %index, action = %action, "Index operation succeeded");
            }
            RunEvent::TaskFailed {
                index,
                action,
                settings,
                error,
            } => {
                tracing::warn!(
                    index = %index,
                    action = %action,
                    settings = ?settings,
                    error = %error,
                    "Index operation failed"
                );
            }
            RunEvent::TaskSkipped { index, reason } => {
                tracing::info!(index = %index, reason = %reason, "Index left untouched");
            }
            RunEvent::Progress { remaining } => {
                tracing::info!(remaining, "{event}");
            }
            RunEvent::RunCompleted {
                processed,
                succeeded,
                failed,
                skipped,
            } => {
                tracing::info!(processed, succeeded, failed, skipped, "Curator run completed");
            }
        }
    }
}

/// Buffers the human-readable transcript of a run
#[derive(Debug)]
pub struct TranscriptSink {
    started_at: DateTime<Utc>,
    lines: Mutex<Vec<String>>,
}

impl Default for TranscriptSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSink {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            lines: Mutex::new(Vec::new()),
        }
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn lines(&self) -> Vec<String> {
        self.buffer().clone()
    }

    /// The transcript framed by run-start and run-end timestamps
    pub fn render(&self, finished_at: DateTime<Utc>) -> String {
        let mut out = format!(
            "Run started: {}\n",
            self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        for line in self.buffer().iter() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!(
            "Run finished: {}\n",
            finished_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        out
    }

    /// Write the transcript, replacing any previous file at `path`
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let contents = self.render(Utc::now());
        tokio::fs::write(path, contents).await
    }
}

impl LogSink for TranscriptSink {
    fn record(&self, event: &RunEvent) {
        self.buffer().push(event.to_string());
    }
}

/// Forwards every event to each inner sink in order
#[derive(Default, Clone)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn LogSink>) {
        self.sinks.push(sink);
    }
}

impl LogSink for CompositeSink {
    fn record(&self, event: &RunEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_lines() {
        assert_eq!(RunEvent::IndicesFound { count: 0 }.to_string(), "Found 0 indices");
        assert_eq!(RunEvent::IndicesFound { count: 1 }.to_string(), "Found 1 index");
        assert_eq!(
            RunEvent::Progress { remaining: 1 }.to_string(),
            "Update completed, 1 index remaining, moving on to next..."
        );

        let mut settings = IndexSettings::new();
        settings.insert("index.routing.allocation.exclude.tag".into(), json!("realtime"));
        let started = RunEvent::TaskStarted {
            index: "logstash-2024.01.01".into(),
            action: Action::Reallocate(Default::default()),
            settings: Some(settings),
            dry_run: true,
        };
        assert_eq!(
            started.to_string(),
            r#"[dry run] index: logstash-2024.01.01, applying reallocate with settings: {"index.routing.allocation.exclude.tag":"realtime"}"#
        );

        let failed = RunEvent::TaskFailed {
            index: "logstash-2024.01.02".into(),
            action: Action::Delete,
            settings: None,
            error: "API error (500): boom".into(),
        };
        assert_eq!(
            failed.to_string(),
            "index: logstash-2024.01.02, delete failed: API error (500): boom"
        );
    }

    #[test]
    fn test_composite_sink_fans_out() {
        let first = Arc::new(TranscriptSink::new());
        let second = Arc::new(TranscriptSink::new());
        let mut sink = CompositeSink::new(vec![first.clone() as Arc<dyn LogSink>]);
        sink.push(second.clone());
        sink.push(Arc::new(TracingSink));

        sink.record(&RunEvent::IndicesFound { count: 2 });

        assert_eq!(first.lines(), vec!["Found 2 indices".to_string()]);
        assert_eq!(second.lines(), first.lines());
    }

    #[test]
    fn test_transcript_is_framed_by_timestamps() {
        let transcript = TranscriptSink::new();
        transcript.record(&RunEvent::IndicesFound { count: 0 });
        transcript.record(&RunEvent::RunCompleted {
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        });

        let rendered = transcript.render(transcript.started_at());
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Run started: "));
        assert_eq!(lines[1], "Found 0 indices");
        assert!(lines[2].starts_with("All indices processed"));
        assert!(lines[3].starts_with("Run finished: "));
    }

    #[tokio::test]
    async fn test_transcript_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.log");

        let transcript = TranscriptSink::new();
        transcript.record(&RunEvent::IndicesFound { count: 3 });
        transcript.write_to(&path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Found 3 indices\n"));
        assert!(contents.trim_end().lines().last().unwrap().starts_with("Run finished: "));
    }
}
