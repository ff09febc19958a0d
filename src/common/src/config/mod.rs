use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

pub mod rules;

pub use rules::{AllocationConfig, DayWindow, RuleConfig, TagFilter};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "curator.toml";

/// Prefix for environment variable overrides, e.g. `CURATOR__CLUSTER__URL`.
pub const ENV_PREFIX: &str = "CURATOR__";

/// Connection settings for the search cluster REST API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`
    pub url: String,
    /// Timeout applied to every HTTP request issued to the cluster
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://localhost:9200"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Where the run transcript is written once the run has drained
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptConfig {
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CuratorConfig {
    /// Index name prefix preceding the `-YYYY.MM.DD` date stamp
    pub index_prefix: String,

    /// Log the planned operations without issuing them.
    ///
    /// Env: CURATOR__CURATOR__DRY_RUN
    #[serde(default)]
    pub dry_run: bool,

    /// Exit with a non-zero status when any task failed.
    ///
    /// Env: CURATOR__CURATOR__STRICT
    #[serde(default)]
    pub strict: bool,

    /// Upper bound for a single settings/close/delete operation
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Optional transcript file written at the end of a run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptConfig>,

    /// Ordered rule table, the last matching rule wins
    pub rules: Vec<RuleConfig>,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            index_prefix: String::from("logstash"),
            dry_run: false,
            strict: false,
            operation_timeout: Duration::from_secs(300),
            transcript: None,
            rules: rules::default_rules(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Search cluster connection
    pub cluster: ClusterConfig,
    /// Index lifecycle settings and the rule table
    pub curator: CuratorConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cluster url '{url}': {source}")]
    InvalidClusterUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported cluster url scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("index prefix cannot be empty")]
    EmptyIndexPrefix,

    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },
}

impl Configuration {
    /// Load from `curator.toml` in the working directory (if present) and the environment
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Path::new(DEFAULT_CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Load from an explicit TOML file, still honouring environment overrides
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(path).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Checks the connection and runtime settings. The rule table is validated
    /// separately when it is compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.cluster.url).map_err(|source| {
            ConfigError::InvalidClusterUrl {
                url: self.cluster.url.clone(),
                source,
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        if self.curator.index_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyIndexPrefix);
        }

        if self.cluster.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "cluster.request_timeout",
            });
        }
        if self.curator.operation_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "curator.operation_timeout",
            });
        }

        Ok(())
    }
}
