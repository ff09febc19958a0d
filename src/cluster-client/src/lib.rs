//! Minimal HTTP client for the parts of the search cluster REST API the
//! curator needs: the `_cat/indices` listing, index settings updates, closing
//! and deleting indices.

mod client;
mod error;

pub use client::{ClusterClient, IndexSettings};
pub use error::ClientError;
