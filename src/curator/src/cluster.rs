//! Seams to the search cluster. The curator only talks to these traits; the
//! HTTP client implements both.

use async_trait::async_trait;
use cluster_client::{ClientError, ClusterClient, IndexSettings};

/// Source of the raw index listing, one line per index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexLister: Send + Sync {
    async fn list_indices(&self) -> Result<String, ClientError>;
}

/// Index operations issued by the executor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterOps: Send + Sync {
    async fn apply_settings(&self, index: &str, settings: &IndexSettings)
    -> Result<(), ClientError>;

    async fn close(&self, index: &str) -> Result<(), ClientError>;

    /// Deleting an index that does not exist must succeed
    async fn delete(&self, index: &str) -> Result<(), ClientError>;
}

#[async_trait]
impl IndexLister for ClusterClient {
    async fn list_indices(&self) -> Result<String, ClientError> {
        self.cat_indices().await
    }
}

#[async_trait]
impl ClusterOps for ClusterClient {
    async fn apply_settings(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> Result<(), ClientError> {
        self.put_settings(index, settings).await
    }

    async fn close(&self, index: &str) -> Result<(), ClientError> {
        self.close_index(index).await
    }

    async fn delete(&self, index: &str) -> Result<(), ClientError> {
        self.delete_index(index).await
    }
}
