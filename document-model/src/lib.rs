//! Shared models used across crates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single retrievable unit of content.
///
/// Identifier uniqueness is enforced by the backend, not here; the store
/// translates its duplicate policy into backend operation verbs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique id for this document within a store index. Immutable once written.
    pub id: String,
    /// Text content of the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Dense embedding; fixed dimensionality per store instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Secondary sparse representation. Accepted on input but never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_embedding: Option<SparseEmbedding>,
    /// Metadata with string keys and scalar or array values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    /// Relevance score, populated only on retrieval. Ignored on write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
            embedding: None,
            sparse_embedding: None,
            meta: BTreeMap::new(),
            score: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// Sparse vector as parallel index/value lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseEmbedding {
    pub indices: Vec<usize>,
    pub values: Vec<f32>,
}

/// How a write resolves an already-existing document id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Defer to the backend default, which rejects existing ids (same as `Fail`).
    #[default]
    None,
    /// Raise a duplicate error naming every conflicting id.
    Fail,
    /// Silently keep the existing document; the conflict is not an error.
    Skip,
    /// Replace the existing document.
    Overwrite,
}
