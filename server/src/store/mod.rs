//! Document store capability
//!
//! The gateway talks to its store only through [`DocumentStore`]. Two
//! backends exist: a remote Elasticsearch cluster and an embedded
//! in-memory full-text index.

mod elastic;
mod embedded;

pub use elastic::ElasticStore;
pub use embedded::EmbeddedStore;

use std::sync::Arc;

use async_trait::async_trait;
use common::{JobOffer, JobOfferPatch};
use thiserror::Error;
use tracing::info;

use crate::config::{Backend, Config};

/// Fields covered by free-text search
pub const SEARCH_FIELDS: [&str; 4] = ["Job", "Company", "Address", "Description"];

/// Hits returned by a search when the caller sets no size (matches Elasticsearch)
pub const DEFAULT_RESULT_WINDOW: usize = 10;

/// Failure of a document store call
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unreachable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("document store rejected the request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("unexpected document store response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document store internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Message safe to hand back to API callers
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "Document store unavailable",
            Self::Rejected { .. } => "Document store rejected the request",
            Self::Malformed(_) => "Document store returned an unexpected response",
            Self::Internal(_) => "Internal server error",
        }
    }
}

impl From<tantivy::TantivyError> for StoreError {
    fn from(err: tantivy::TantivyError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// The five primitives the gateway needs from a document store.
///
/// Implementations are bound to one collection at construction time and
/// must be safe to share across concurrent requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document and returns the generated id. With `refresh`
    /// set, the document is visible to reads and searches on return.
    async fn index(&self, source: &JobOffer, refresh: bool) -> Result<String, StoreError>;

    /// Fetches a document by id, `None` if it does not exist.
    async fn get(&self, id: &str) -> Result<Option<JobOffer>, StoreError>;

    /// Merges the present patch fields into an existing document.
    async fn update(&self, id: &str, patch: &JobOfferPatch) -> Result<(), StoreError>;

    /// Removes a document.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Multi-field match on [`SEARCH_FIELDS`], or every document when `query` is `None`.
    async fn search(&self, query: Option<&str>) -> Result<Vec<JobOffer>, StoreError>;
}

/// Builds the configured store backend
pub fn connect(config: &Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        Backend::Elasticsearch => {
            info!(
                url = %config.elastic_url(),
                index = %config.index,
                "Using Elasticsearch document store"
            );
            let store = ElasticStore::new(
                &config.elastic_url(),
                &config.index,
                config.credentials(),
            )?;
            Ok(Arc::new(store))
        }
        Backend::Embedded => {
            info!("Using embedded in-memory document store");
            Ok(Arc::new(EmbeddedStore::new()?))
        }
    }
}
