/// Errors from the cluster client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error, including request timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Cluster answered with a non-2xx status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error reason reported by the cluster, or the raw body
        message: String,
    },
}
