use std::time::Duration;

use cluster_client::ClientError;
use thiserror::Error;

use crate::rules::RuleConfigError;

/// Failure of a single settings/close/delete operation
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that prevent a run from starting or planning
#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("failed to list indices: {0}")]
    Listing(#[source] ClientError),

    #[error("invalid rule table: {0}")]
    Rules(#[from] RuleConfigError),

    #[error("invalid index prefix '{prefix}': {source}")]
    IndexPrefix {
        prefix: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T, E = CuratorError> = std::result::Result<T, E>;
