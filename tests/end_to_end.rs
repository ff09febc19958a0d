use std::collections::{BTreeMap, HashSet};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use cluster_client::ClusterClient;
use common::config::{AllocationConfig, CuratorConfig, DayWindow, RuleConfig, TagFilter};
use curator::{Curator, CuratorMetrics, TaskStatus, TranscriptSink};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// In-memory stand-in for the cluster REST API
#[derive(Clone, Default)]
struct FakeCluster {
    /// index name -> open
    indices: Arc<Mutex<BTreeMap<String, bool>>>,
    failing_settings: Arc<Mutex<HashSet<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
    settings: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl FakeCluster {
    fn with_indices(indices: &[(&str, bool)]) -> Self {
        let cluster = Self::default();
        {
            let mut map = cluster.indices.lock().unwrap();
            for (name, open) in indices {
                map.insert(name.to_string(), *open);
            }
        }
        cluster
    }

    fn fail_settings_for(&self, index: &str) {
        self.failing_settings
            .lock()
            .unwrap()
            .insert(index.to_string());
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn log(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

async fn cat_indices(State(cluster): State<FakeCluster>) -> String {
    cluster
        .indices
        .lock()
        .unwrap()
        .iter()
        .map(|(name, open)| {
            if *open {
                format!("green  open  {name} uuid 1 1 10 0 10kb 5kb\n")
            } else {
                format!("       close {name} uuid\n")
            }
        })
        .collect()
}

async fn put_settings(
    State(cluster): State<FakeCluster>,
    Path(index): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    cluster.log(format!("PUT {index}"));
    if cluster.failing_settings.lock().unwrap().contains(&index) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"reason": "allocation update rejected"}, "status": 500})),
        );
    }
    cluster.settings.lock().unwrap().insert(index, body);
    (StatusCode::OK, Json(json!({"acknowledged": true})))
}

async fn close_index(
    State(cluster): State<FakeCluster>,
    Path(index): Path<String>,
) -> (StatusCode, Json<Value>) {
    cluster.log(format!("CLOSE {index}"));
    if let Some(open) = cluster.indices.lock().unwrap().get_mut(&index) {
        *open = false;
    }
    (StatusCode::OK, Json(json!({"acknowledged": true})))
}

async fn delete_index(
    State(cluster): State<FakeCluster>,
    Path(index): Path<String>,
) -> (StatusCode, Json<Value>) {
    cluster.log(format!("DELETE {index}"));
    match cluster.indices.lock().unwrap().remove(&index) {
        Some(_) => (StatusCode::OK, Json(json!({"acknowledged": true}))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"reason": "no such index"}, "status": 404})),
        ),
    }
}

async fn start(cluster: FakeCluster) -> String {
    let app = Router::new()
        .route("/_cat/indices", get(cat_indices))
        .route("/:index/_settings", put(put_settings))
        .route("/:index/_close", post(close_index))
        .route("/:index", delete(delete_index))
        .with_state(cluster);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn tag(value: &str) -> TagFilter {
    TagFilter::from([("tag".to_string(), value.to_string())])
}

/// Hot for a week, warm until 30 days, closed until 90, then deleted
fn tiered_config() -> CuratorConfig {
    CuratorConfig {
        rules: vec![
            RuleConfig {
                days: DayWindow {
                    from: Some(0),
                    to: Some(7),
                },
                allocation: Some(AllocationConfig {
                    require: tag("hot"),
                    total_shards_per_node: Some(3),
                    ..Default::default()
                }),
                ..Default::default()
            },
            RuleConfig {
                days: DayWindow {
                    from: Some(7),
                    to: None,
                },
                allocation: Some(AllocationConfig {
                    require: tag("warm"),
                    exclude: tag("realtime"),
                    total_shards_per_node: Some(-1),
                    ..Default::default()
                }),
                ..Default::default()
            },
            RuleConfig {
                days: DayWindow {
                    from: Some(30),
                    to: None,
                },
                close: true,
                ..Default::default()
            },
            RuleConfig {
                days: DayWindow {
                    from: Some(90),
                    to: None,
                },
                delete: true,
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn curator_for(url: &str, config: &CuratorConfig) -> Curator {
    let client = Arc::new(ClusterClient::new(url, Duration::from_secs(5)).unwrap());
    Curator::new(client.clone(), client, config, CuratorMetrics::new()).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

#[tokio::test]
async fn test_tiered_lifecycle_against_http_cluster() {
    let cluster = FakeCluster::with_indices(&[
        ("logstash-2024.06.28", true),
        ("logstash-2024.06.10", true),
        ("logstash-2024.05.01", true),
        ("logstash-2024.04.30", false),
        ("logstash-2024.01.01", false),
        ("logstash-2024.07.02", true),
        (".kibana", true),
    ]);
    cluster.fail_settings_for("logstash-2024.06.10");
    let url = start(cluster.clone()).await;

    let curator = curator_for(&url, &tiered_config());
    let sink = TranscriptSink::new();
    let summary = curator.run(today(), &sink).await.unwrap();

    // Sorted by name, strictly one after the other; the failed settings
    // update does not stop the run, the closed 2024.04.30 is left alone and
    // the future-dated 2024.07.02 gets the first tier
    assert_eq!(
        cluster.requests(),
        vec![
            "DELETE logstash-2024.01.01",
            "CLOSE logstash-2024.05.01",
            "PUT logstash-2024.06.10",
            "PUT logstash-2024.06.28",
            "PUT logstash-2024.07.02",
        ]
    );

    assert_eq!(summary.indices_found, 7);
    assert_eq!(summary.outcomes.len(), 6);
    assert_eq!(summary.succeeded(), 4);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.outcomes[1].index, "logstash-2024.04.30");
    assert_eq!(summary.outcomes[1].status, TaskStatus::Skipped);
    assert_eq!(summary.outcomes[3].status, TaskStatus::Failed);

    let settings = cluster.settings.lock().unwrap();
    let hot = json!({
        "index.routing.allocation.require.tag": "hot",
        "index.routing.allocation.total_shards_per_node": 3
    });
    assert_eq!(settings["logstash-2024.06.28"], hot);
    assert_eq!(settings["logstash-2024.07.02"], hot);

    let indices = cluster.indices.lock().unwrap();
    assert!(!indices.contains_key("logstash-2024.01.01"));
    assert!(!indices["logstash-2024.05.01"]);

    let lines = sink.lines();
    assert!(lines.iter().any(|l| l.contains(
        "index: logstash-2024.06.10, reallocate failed: API error (500): allocation update rejected"
    )));
    assert!(lines.iter().all(|l| !l.contains(".kibana")));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let cluster = FakeCluster::with_indices(&[
        ("logstash-2024.05.01", true),
        ("logstash-2024.01.01", false),
    ]);
    let url = start(cluster.clone()).await;
    let curator = curator_for(&url, &tiered_config());

    curator
        .run(today(), &TranscriptSink::new())
        .await
        .unwrap();
    let second = curator
        .run(today(), &TranscriptSink::new())
        .await
        .unwrap();

    // The deleted index is gone and the closed one needs nothing more
    assert_eq!(second.outcomes.len(), 1);
    assert_eq!(second.outcomes[0].status, TaskStatus::Skipped);
    assert_eq!(
        cluster.requests(),
        vec!["DELETE logstash-2024.01.01", "CLOSE logstash-2024.05.01"]
    );
}

#[tokio::test]
async fn test_transcript_file_frames_the_run() {
    let cluster = FakeCluster::default();
    let url = start(cluster).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curator.log");

    let curator = curator_for(&url, &tiered_config());
    let transcript = TranscriptSink::new();
    curator.run(today(), &transcript).await.unwrap();
    transcript.write_to(&path).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].starts_with("Run started: "));
    assert_eq!(lines[1], "Classifying indices relative to 2024-06-30");
    assert_eq!(lines[2], "Found 0 indices");
    assert_eq!(
        lines[3],
        "All indices processed, finished. (0 processed: 0 succeeded, 0 failed, 0 skipped)"
    );
    assert!(lines[4].starts_with("Run finished: "));
}

fn write_config(dir: &std::path::Path, url: &str, strict: bool) -> std::path::PathBuf {
    let path = dir.join("curator.toml");
    let transcript = dir.join("transcript.log");
    std::fs::write(
        &path,
        format!(
            r#"
[cluster]
url = "{url}"
request_timeout = "5s"

[curator]
strict = {strict}
operation_timeout = "10s"

[curator.transcript]
path = "{}"

[[curator.rules]]
days = {{ from = 30 }}
close = true
"#,
            transcript.display()
        ),
    )
    .unwrap();
    path
}

fn run_binary(args: Vec<String>) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_index-curator"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_exit_status_and_transcript() {
    let cluster = FakeCluster::with_indices(&[("logstash-2024.01.01", true)]);
    let url = start(cluster.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &url, false);

    let args = vec![
        "--config".to_string(),
        config.display().to_string(),
        "--today".to_string(),
        "2024-06-30".to_string(),
    ];
    let output = tokio::task::spawn_blocking(move || run_binary(args))
        .await
        .unwrap();

    assert!(output.status.success());
    assert_eq!(cluster.requests(), vec!["CLOSE logstash-2024.01.01"]);

    let transcript = std::fs::read_to_string(dir.path().join("transcript.log")).unwrap();
    assert!(transcript.contains("index: logstash-2024.01.01, close succeeded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_dry_run_and_strict_mode() {
    let cluster = FakeCluster::with_indices(&[("logstash-2024.01.01", true)]);
    let url = start(cluster.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &url, true);

    let dry_run = vec![
        "--config".to_string(),
        config.display().to_string(),
        "--today".to_string(),
        "2024-06-30".to_string(),
        "--dry-run".to_string(),
    ];
    let output = tokio::task::spawn_blocking(move || run_binary(dry_run))
        .await
        .unwrap();
    assert!(output.status.success());
    assert!(cluster.requests().is_empty());

    // Strict mode turns a failed operation into a non-zero exit status
    let failing = FakeCluster::with_indices(&[("logstash-2024.06.01", true)]);
    failing.fail_settings_for("logstash-2024.06.01");
    let failing_url = start(failing.clone()).await;
    let failing_dir = tempfile::tempdir().unwrap();
    let failing_config = failing_dir.path().join("curator.toml");
    std::fs::write(
        &failing_config,
        format!(
            r#"
[cluster]
url = "{failing_url}"

[curator]
strict = true

[[curator.rules]]
days = {{ from = 0 }}
allocation = {{ exclude = {{ tag = "realtime" }} }}
"#
        ),
    )
    .unwrap();

    let strict = vec![
        "--config".to_string(),
        failing_config.display().to_string(),
        "--today".to_string(),
        "2024-06-30".to_string(),
    ];
    let output = tokio::task::spawn_blocking(move || run_binary(strict))
        .await
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(failing.requests(), vec!["PUT logstash-2024.06.01"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_plan_prints_tasks_without_changes() {
    let cluster = FakeCluster::with_indices(&[
        ("logstash-2024.01.01", true),
        ("logstash-2024.06.29", true),
    ]);
    let url = start(cluster.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &url, false);

    let args = vec![
        "--config".to_string(),
        config.display().to_string(),
        "--today".to_string(),
        "2024-06-30".to_string(),
        "plan".to_string(),
    ];
    let output = tokio::task::spawn_blocking(move || run_binary(args))
        .await
        .unwrap();

    assert!(output.status.success());
    assert!(cluster.requests().is_empty());

    let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["indices_found"], 2);
    let tasks = plan["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["descriptor"]["name"], "logstash-2024.01.01");
    assert_eq!(tasks[0]["action"]["type"], "close");
}
