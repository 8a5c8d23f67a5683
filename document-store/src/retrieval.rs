//! The two ranking retrieval strategies: lexical fuzzy multi-field search and
//! dense-vector nearest-neighbor search. Both only shape requests; fetching
//! and pagination live in the search executor.

use document_model::Document;
use serde_json::json;

use crate::filter::{normalize, FilterExpr};
use crate::transport::{KnnQuery, SearchRequest};
use crate::StoreError;

/// Raw lexical scores are unbounded; rescaling maps them into (0, 1) with a
/// logistic curve. 8 was chosen empirically so typical raw scores (under ~30)
/// spread across the range instead of saturating near 1.
pub const BM25_SCALING_FACTOR: f32 = 8.0;

/// Options for lexical ranked search.
#[derive(Debug, Clone)]
pub struct Bm25Search<'a> {
    pub filters: Option<&'a FilterExpr>,
    /// Backend-native fuzzy matching tolerance.
    pub fuzziness: String,
    pub top_k: usize,
    /// Map raw scores into (0, 1).
    pub scale_score: bool,
}

impl Default for Bm25Search<'_> {
    fn default() -> Self {
        Self { filters: None, fuzziness: "AUTO".to_string(), top_k: 10, scale_score: false }
    }
}

/// Options for dense-vector nearest-neighbor search.
#[derive(Debug, Clone)]
pub struct EmbeddingSearch<'a> {
    pub filters: Option<&'a FilterExpr>,
    pub top_k: usize,
    /// Candidate pool size; `None` defaults to `10 * top_k`.
    pub num_candidates: Option<usize>,
}

impl Default for EmbeddingSearch<'_> {
    fn default() -> Self {
        Self { filters: None, top_k: 10, num_candidates: None }
    }
}

/// Builds the lexical query: the string must match across all indexed text
/// fields, OR-combined, with fuzzy matching at the configured tolerance.
pub(crate) fn bm25_request(query: &str, opts: &Bm25Search<'_>) -> Result<SearchRequest, StoreError> {
    if query.is_empty() {
        return Err(StoreError::InvalidArgument("query must be a non-empty string".into()));
    }

    let mut bool_clause = json!({
        "must": [{
            "multi_match": {
                "query": query,
                "fuzziness": opts.fuzziness,
                "type": "most_fields",
                "operator": "OR",
            }
        }]
    });
    if let Some(expr) = opts.filters {
        bool_clause["filter"] = json!([normalize(expr)?]);
    }

    Ok(SearchRequest {
        query: Some(json!({"bool": bool_clause})),
        knn: None,
        size: Some(opts.top_k),
        from: 0,
    })
}

/// Builds the approximate-nearest-neighbor request over the `embedding` field.
pub(crate) fn knn_request(
    query_embedding: &[f32],
    opts: &EmbeddingSearch<'_>,
) -> Result<SearchRequest, StoreError> {
    if query_embedding.is_empty() {
        return Err(StoreError::InvalidArgument(
            "query_embedding must be a non-empty vector".into(),
        ));
    }

    let num_candidates = opts.num_candidates.unwrap_or(opts.top_k * 10);
    let filter = match opts.filters {
        Some(expr) => Some(normalize(expr)?),
        None => None,
    };

    Ok(SearchRequest {
        query: None,
        knn: Some(KnnQuery {
            field: "embedding".to_string(),
            query_vector: query_embedding.to_vec(),
            k: opts.top_k,
            num_candidates,
            filter,
        }),
        size: None,
        from: 0,
    })
}

/// Applies the logistic rescale in place. Documents without a score are left
/// unmodified.
pub(crate) fn rescale_scores(documents: &mut [Document]) {
    for document in documents.iter_mut() {
        if let Some(score) = document.score {
            document.score = Some(1.0 / (1.0 + (-score / BM25_SCALING_FACTOR).exp()));
        }
    }
}
