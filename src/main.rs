//! Index Curator
//!
//! Classifies the date-stamped indices of a search cluster by age and applies
//! the configured lifecycle action to each of them, one index at a time.
//! Meant to be invoked periodically by an external scheduler.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use cluster_client::ClusterClient;
use common::cli::{CommonArgs, CommonCommands, utils};
use common::config::Configuration;
use curator::{
    CompositeSink, Curator, CuratorMetrics, RuleTable, TracingSink, TranscriptSink,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Log the planned operations without changing the cluster
    #[arg(long)]
    dry_run: bool,

    /// Exit with a non-zero status when any index operation failed
    #[arg(long)]
    strict: bool,

    /// Reference date for age calculation (defaults to the current UTC day)
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<CommonCommands>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    utils::init_logging(&args.common);

    match execute(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Args) -> Result<ExitCode> {
    let mut config = utils::load_config(args.common.config.as_ref())?;
    config.curator.dry_run |= args.dry_run;
    config.curator.strict |= args.strict;

    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());

    match args.command.unwrap_or_default() {
        CommonCommands::Version => {
            println!("{}", utils::version_info());
            Ok(ExitCode::SUCCESS)
        }
        CommonCommands::Config { json } => {
            utils::display_config(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
        CommonCommands::Validate => {
            validate(&config)?;
            log::info!("Configuration validation passed");
            Ok(ExitCode::SUCCESS)
        }
        CommonCommands::Plan => {
            let curator = build_curator(&config, CuratorMetrics::new())?;
            let plan = curator
                .plan(today, &TracingSink)
                .await
                .context("Failed to plan curator run")?;
            let json =
                serde_json::to_string_pretty(&plan).context("Failed to serialize the plan")?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        CommonCommands::Run => run(&config, today).await,
    }
}

fn validate(config: &Configuration) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    RuleTable::from_config(&config.curator.rules).context("Invalid rule table")?;
    Ok(())
}

fn build_curator(config: &Configuration, metrics: CuratorMetrics) -> Result<Curator> {
    validate(config)?;

    let client = Arc::new(
        ClusterClient::new(&config.cluster.url, config.cluster.request_timeout)
            .context("Failed to create cluster client")?,
    );
    log::info!("Using search cluster at {}", client.base_url());

    Curator::new(client.clone(), client, &config.curator, metrics)
        .context("Failed to initialize curator")
}

async fn run(config: &Configuration, today: NaiveDate) -> Result<ExitCode> {
    let metrics = CuratorMetrics::new();
    let curator = build_curator(config, metrics.clone())?;

    log::info!(
        "Starting curator run with {} rules (dry_run = {})",
        curator.rules().len(),
        config.curator.dry_run
    );

    let transcript = config
        .curator
        .transcript
        .as_ref()
        .map(|t| (Path::new(&t.path), Arc::new(TranscriptSink::new())));

    let mut sink = CompositeSink::default();
    sink.push(Arc::new(TracingSink));
    if let Some((_, transcript)) = &transcript {
        sink.push(transcript.clone());
    }

    let result = curator.run(today, &sink).await;

    if let Some((path, transcript)) = &transcript {
        match transcript.write_to(path).await {
            Ok(()) => log::info!("Transcript written to {}", path.display()),
            Err(e) => log::warn!("Failed to write transcript to {}: {e}", path.display()),
        }
    }

    let summary = result.context("Curator run aborted")?;
    metrics.summary().log();

    if config.curator.strict && summary.has_failures() {
        log::warn!(
            "{} of {} index operations failed",
            summary.failed(),
            summary.outcomes.len()
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
