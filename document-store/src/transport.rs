//! The backend transport seam.
//!
//! The store shapes requests and interprets structured responses; everything
//! network-level (protocol, timeouts, retries) belongs to the transport
//! implementation behind [`SearchTransport`].

use async_trait::async_trait;
use serde_json::Value;

/// Error kind a backend reports when a create-only operation hits an existing id.
pub const VERSION_CONFLICT: &str = "version_conflict_engine_exception";

/// Failure reported by the transport. Crosses the read path unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// A ranked, filtered, paginated query.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Native query clause, if any. `None` matches everything.
    pub query: Option<Value>,
    /// Approximate-nearest-neighbor request, if any.
    pub knn: Option<KnnQuery>,
    /// Requested result count. `None` leaves the page size to the backend.
    pub size: Option<usize>,
    /// Result offset for pagination.
    pub from: usize,
}

/// Approximate-nearest-neighbor search over a dense vector field.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    pub field: String,
    pub query_vector: Vec<f32>,
    /// Number of neighbors to return.
    pub k: usize,
    /// Candidate pool scanned internally; trades recall against latency.
    pub num_candidates: usize,
    /// Native clause restricting the candidate pool.
    pub filter: Option<Value>,
}

/// One raw hit as the backend returns it.
#[derive(Debug, Clone)]
pub struct Hit {
    pub id: String,
    /// Stored record fields, verbatim.
    pub source: Value,
    pub score: Option<f32>,
    /// Highlighting fragment, when the backend produced one.
    pub highlight: Option<Value>,
}

/// One page of results plus the total match count across all pages.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<Hit>,
    pub total: u64,
}

/// Operation verb for one bulk item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkVerb {
    /// Create only; rejects an existing id with [`VERSION_CONFLICT`].
    Create,
    /// Upsert; replaces an existing id.
    Index,
    Delete,
}

#[derive(Debug, Clone)]
pub struct BulkAction {
    pub verb: BulkVerb,
    pub id: String,
    /// Record fields; `None` for deletes.
    pub source: Option<Value>,
}

/// Per-item failure from a bulk operation. One item's failure never blocks
/// the rest of the batch.
#[derive(Debug, Clone)]
pub struct BulkItemError {
    pub id: String,
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Items the backend confirms as applied.
    pub written: usize,
    pub errors: Vec<BulkItemError>,
}

/// Client capabilities the store requires from its environment.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Connectivity probe. Fails if the backend is unreachable.
    async fn ping(&self) -> Result<(), TransportError>;

    async fn index_exists(&self, index: &str) -> Result<bool, TransportError>;

    async fn create_index(&self, index: &str, schema: &Value) -> Result<(), TransportError>;

    /// Total number of documents in the index.
    async fn count(&self, index: &str) -> Result<u64, TransportError>;

    /// One page of a ranked/filtered search.
    async fn search(&self, index: &str, request: &SearchRequest)
        -> Result<SearchPage, TransportError>;

    /// Submits a batch of document operations. With `refresh`, changes are
    /// visible to subsequent reads before this returns.
    async fn bulk(
        &self,
        index: &str,
        actions: Vec<BulkAction>,
        refresh: bool,
    ) -> Result<BulkReport, TransportError>;
}
