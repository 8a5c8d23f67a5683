//! The store façade: lifecycle, counting, filtering, writing, deletion and
//! the two retrieval strategies, each as a blocking/suspending method pair
//! over one async body.

use std::future::Future;

use document_model::{Document, DuplicatePolicy};
use embedding_provider::embedder::Embedder;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::filter::{normalize, FilterExpr};
use crate::retrieval::{bm25_request, knn_request, rescale_scores, Bm25Search, EmbeddingSearch};
use crate::search::run_search;
use crate::transport::{BulkAction, BulkVerb, SearchRequest, SearchTransport};
use crate::{write, StoreError};

/// Similarity function configured on the dense vector field when the index
/// is created. Has no effect on an index that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
    L2Norm,
    MaxInnerProduct,
}

impl Similarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::DotProduct => "dot_product",
            Self::L2Norm => "l2_norm",
            Self::MaxInnerProduct => "max_inner_product",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name of the backend index/collection.
    pub index: String,
    pub similarity: Similarity,
    /// Schema used if the index has to be created; `None` uses the default
    /// schema (vector field, text content field, keyword catch-all).
    pub custom_schema: Option<Value>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { index: "default".to_string(), similarity: Similarity::Cosine, custom_schema: None }
    }
}

/// A document store over a [`SearchTransport`] backend.
///
/// Connectivity and index creation happen lazily, exactly once, on the first
/// data operation; concurrent first callers wait on the same initialization.
pub struct DocumentStore<T: SearchTransport> {
    transport: T,
    config: StoreConfig,
    ready: OnceCell<()>,
}

impl<T: SearchTransport> DocumentStore<T> {
    pub fn new(transport: T, config: StoreConfig) -> Self {
        Self { transport, config, ready: OnceCell::new() }
    }

    /// Runs one async operation to completion for the blocking entry points.
    /// Must not be called from inside an async context; use the `_async`
    /// methods there.
    fn block_on<F, R>(&self, operation: F) -> Result<R, StoreError>
    where
        F: Future<Output = Result<R, StoreError>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Store(format!("failed to start blocking runtime: {e}")))?;
        runtime.block_on(operation)
    }

    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// The backend transport handle. Shared read-only configuration; does not
    /// trigger initialization.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn similarity(&self) -> Similarity {
        self.config.similarity
    }

    /// One-time transition to the ready state: probe connectivity, then make
    /// sure the index exists, creating it if necessary.
    async fn ready(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| async {
                self.transport.ping().await?;
                if !self.transport.index_exists(&self.config.index).await? {
                    let schema = match &self.config.custom_schema {
                        Some(schema) => schema.clone(),
                        None => default_schema(self.config.similarity),
                    };
                    self.transport.create_index(&self.config.index, &schema).await?;
                    debug!(index = %self.config.index, "created index");
                }
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    pub async fn count_documents_async(&self) -> Result<u64, StoreError> {
        self.ready().await?;
        Ok(self.transport.count(&self.config.index).await?)
    }

    pub fn count_documents(&self) -> Result<u64, StoreError> {
        self.block_on(self.count_documents_async())
    }

    /// Retrieves every document matching the filter, in backend order. An
    /// absent filter matches the whole index.
    pub async fn filter_documents_async(
        &self,
        filters: Option<&FilterExpr>,
    ) -> Result<Vec<Document>, StoreError> {
        // Normalization failures must surface before any backend round-trip.
        let query = match filters {
            Some(expr) => Some(json!({"bool": {"filter": [normalize(expr)?]}})),
            None => None,
        };
        self.ready().await?;
        let request = SearchRequest { query, ..Default::default() };
        run_search(&self.transport, &self.config.index, &request).await
    }

    pub fn filter_documents(&self, filters: Option<&FilterExpr>) -> Result<Vec<Document>, StoreError> {
        self.block_on(self.filter_documents_async(filters))
    }

    /// Writes a batch of documents, resolving id conflicts per `policy`.
    /// Returns the number of documents the backend confirms as written;
    /// conflicts skipped under [`DuplicatePolicy::Skip`] are not counted.
    pub async fn write_documents_async(
        &self,
        documents: &[Document],
        policy: DuplicatePolicy,
    ) -> Result<usize, StoreError> {
        let (actions, policy) = write::build_actions(documents, policy)?;
        self.ready().await?;
        if actions.is_empty() {
            return Ok(0);
        }
        let report = self
            .transport
            .bulk(&self.config.index, actions, true)
            .await
            .map_err(|e| StoreError::Store(format!("failed to write documents: {e}")))?;
        write::reconcile(&report, policy)
    }

    pub fn write_documents(
        &self,
        documents: &[Document],
        policy: DuplicatePolicy,
    ) -> Result<usize, StoreError> {
        self.block_on(self.write_documents_async(documents, policy))
    }

    /// Deletes all documents with a matching id. Missing ids are not an error.
    pub async fn delete_documents_async(&self, document_ids: &[String]) -> Result<(), StoreError> {
        self.ready().await?;
        if document_ids.is_empty() {
            return Ok(());
        }
        let actions = document_ids
            .iter()
            .map(|id| BulkAction { verb: BulkVerb::Delete, id: id.clone(), source: None })
            .collect();
        self.transport
            .bulk(&self.config.index, actions, true)
            .await
            .map_err(|e| StoreError::Store(format!("failed to delete documents: {e}")))?;
        Ok(())
    }

    pub fn delete_documents(&self, document_ids: &[String]) -> Result<(), StoreError> {
        self.block_on(self.delete_documents_async(document_ids))
    }

    /// Lexical ranked search with fuzzy multi-field matching.
    pub async fn bm25_retrieval_async(
        &self,
        query: &str,
        opts: &Bm25Search<'_>,
    ) -> Result<Vec<Document>, StoreError> {
        let request = bm25_request(query, opts)?;
        self.ready().await?;
        let mut documents = run_search(&self.transport, &self.config.index, &request).await?;
        if opts.scale_score {
            rescale_scores(&mut documents);
        }
        Ok(documents)
    }

    pub fn bm25_retrieval(
        &self,
        query: &str,
        opts: &Bm25Search<'_>,
    ) -> Result<Vec<Document>, StoreError> {
        self.block_on(self.bm25_retrieval_async(query, opts))
    }

    /// Approximate-nearest-neighbor search over document embeddings.
    pub async fn embedding_retrieval_async(
        &self,
        query_embedding: &[f32],
        opts: &EmbeddingSearch<'_>,
    ) -> Result<Vec<Document>, StoreError> {
        let request = knn_request(query_embedding, opts)?;
        self.ready().await?;
        run_search(&self.transport, &self.config.index, &request).await
    }

    pub fn embedding_retrieval(
        &self,
        query_embedding: &[f32],
        opts: &EmbeddingSearch<'_>,
    ) -> Result<Vec<Document>, StoreError> {
        self.block_on(self.embedding_retrieval_async(query_embedding, opts))
    }

    /// Convenience: embed the query text through the collaborator, then run a
    /// vector search with the resulting embedding.
    pub async fn retrieve_with_embedder_async(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        opts: &EmbeddingSearch<'_>,
    ) -> Result<Vec<Document>, StoreError> {
        if query.is_empty() {
            return Err(StoreError::InvalidArgument("query must be a non-empty string".into()));
        }
        let query_embedding = embedder
            .embed(query)
            .map_err(|e| StoreError::Store(format!("failed to embed query: {e}")))?;
        self.embedding_retrieval_async(&query_embedding, opts).await
    }

    pub fn retrieve_with_embedder(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        opts: &EmbeddingSearch<'_>,
    ) -> Result<Vec<Document>, StoreError> {
        self.block_on(self.retrieve_with_embedder_async(embedder, query, opts))
    }
}

/// Default index schema: a dense vector field with the configured similarity,
/// a text content field, and a catch-all rule mapping unrecognized string
/// fields to exact-match keyword fields.
fn default_schema(similarity: Similarity) -> Value {
    json!({
        "properties": {
            "embedding": {
                "type": "dense_vector",
                "index": true,
                "similarity": similarity.as_str(),
            },
            "content": {"type": "text"},
        },
        "dynamic_templates": [{
            "strings": {
                "path_match": "*",
                "match_mapping_type": "string",
                "mapping": {"type": "keyword"},
            }
        }],
    })
}
