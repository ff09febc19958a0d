use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::ClientError;

/// Flat index settings keyed by dotted path, e.g.
/// `index.routing.allocation.exclude.tag`.
pub type IndexSettings = BTreeMap<String, serde_json::Value>;

/// HTTP client for the search cluster REST API
#[derive(Debug, Clone)]
pub struct ClusterClient {
    base_url: String,
    http: reqwest::Client,
}

impl ClusterClient {
    /// Create a new client pointing at the given base URL. Every request is
    /// bounded by `request_timeout`.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the plain-text index listing, one line per index
    pub async fn cat_indices(&self) -> Result<String, ClientError> {
        let url = format!("{}/_cat/indices", self.base_url);
        tracing::debug!(url = %url, "Listing indices");

        let resp = self.http.get(&url).send().await?;
        if resp.status().is_success() {
            Ok(resp.text().await?)
        } else {
            Err(api_error(resp).await)
        }
    }

    /// Update index settings with a flat map of dotted keys
    pub async fn put_settings(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> Result<(), ClientError> {
        let url = format!("{}/{index}/_settings", self.base_url);
        let resp = self.http.put(&url).json(settings).send().await?;
        expect_success(resp).await
    }

    /// Close an index
    pub async fn close_index(&self, index: &str) -> Result<(), ClientError> {
        let url = format!("{}/{index}/_close", self.base_url);
        let resp = self.http.post(&url).send().await?;
        expect_success(resp).await
    }

    /// Delete an index. An index that no longer exists counts as deleted.
    pub async fn delete_index(&self, index: &str) -> Result<(), ClientError> {
        let url = format!("{}/{index}", self.base_url);
        let resp = self.http.delete(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            tracing::debug!(index = %index, "Index already gone, treating delete as done");
            return Ok(());
        }
        expect_success(resp).await
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured { reason: String },
    Plain(String),
}

async fn expect_success(resp: reqwest::Response) -> Result<(), ClientError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(api_error(resp).await)
    }
}

async fn api_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    ClientError::Api {
        status,
        message: error_message(text),
    }
}

fn error_message(text: String) -> String {
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            error: ErrorDetail::Structured { reason },
        }) => reason,
        Ok(ErrorBody {
            error: ErrorDetail::Plain(message),
        }) => message,
        Err(_) => text,
    }
}
