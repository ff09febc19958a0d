use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Default, PartialEq, Eq)]
pub enum CommonCommands {
    /// Classify indices and apply the matching actions (default behavior)
    #[default]
    Run,
    /// Print the planned tasks as JSON without touching the cluster
    Plan,
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::{Configuration, RuleConfig};
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level implied by the verbosity flags
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments. `RUST_LOG` still wins when set.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    fn describe_rule(rule: &RuleConfig) -> String {
        let from = rule
            .days
            .from
            .map_or_else(|| "-inf".to_string(), |d| d.to_string());
        let to = rule
            .days
            .to
            .map_or_else(|| "+inf".to_string(), |d| d.to_string());
        let action = if rule.delete {
            "delete".to_string()
        } else if rule.close {
            "close".to_string()
        } else if let Some(allocation) = &rule.allocation {
            format!(
                "allocation include={:?} exclude={:?} require={:?} total_shards_per_node={:?}",
                allocation.include,
                allocation.exclude,
                allocation.require,
                allocation.total_shards_per_node
            )
        } else {
            "none".to_string()
        };
        format!("[{from}, {to}) days -> {action}")
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Index Curator Configuration:");
            println!("============================");
            println!("Cluster URL: {}", config.cluster.url);
            println!("Request timeout: {:?}", config.cluster.request_timeout);
            println!("Index prefix: {}", config.curator.index_prefix);
            println!("Dry run: {}", config.curator.dry_run);
            println!("Strict exit status: {}", config.curator.strict);
            println!("Operation timeout: {:?}", config.curator.operation_timeout);

            match &config.curator.transcript {
                Some(transcript) => println!("Transcript: {}", transcript.path),
                None => println!("Transcript: disabled"),
            }

            println!("Rules ({}):", config.curator.rules.len());
            for (position, rule) in config.curator.rules.iter().enumerate() {
                println!("  {}. {}", position + 1, describe_rule(rule));
            }
        }
        Ok(())
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_commands_default() {
        assert_eq!(CommonCommands::default(), CommonCommands::Run);
    }

    #[test]
    fn test_log_level_from_flags() {
        let mut args = CommonArgs::default();
        assert_eq!(utils::log_level(&args), "info");

        args.verbose = true;
        assert_eq!(utils::log_level(&args), "debug");

        args.quiet = true;
        assert_eq!(utils::log_level(&args), "warn");
    }

    #[test]
    fn test_version_info() {
        let version = utils::version_info();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
    }
}
