pub mod filter;
pub mod retrieval;
pub mod store;
pub mod transport;

mod search;
mod write;

pub use document_model::{Document, DuplicatePolicy, SparseEmbedding};
pub use filter::{ComparisonOp, FilterExpr, LogicOp};
pub use retrieval::{Bm25Search, EmbeddingSearch, BM25_SCALING_FACTOR};
pub use store::{DocumentStore, Similarity, StoreConfig};
pub use transport::{
    BulkAction, BulkItemError, BulkReport, BulkVerb, Hit, KnnQuery, SearchPage, SearchRequest,
    SearchTransport, TransportError,
};

/// Errors surfaced by the document store.
///
/// Read-path transport failures cross this layer unchanged as `Transport`;
/// write and delete failures are wrapped with context.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed local input. Raised before any backend call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A filter expression that cannot be normalized. Raised before any backend call.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// Ids that already exist under a policy that forbids overwrite.
    #[error("ids '{}' already exist in the document store", ids.join(", "))]
    Duplicate { ids: Vec<String> },
    /// Backend-reported failure while writing or deleting documents.
    #[error("document store error: {0}")]
    Store(String),
    #[error(transparent)]
    Transport(#[from] transport::TransportError),
}
