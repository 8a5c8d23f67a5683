//! Paginated search execution: consume backend pages until the target count
//! or the total match count is exhausted.

use document_model::Document;

use crate::transport::{Hit, SearchRequest, SearchTransport};
use crate::StoreError;

/// Reserved metadata key carrying the backend's highlighting fragment.
pub const HIGHLIGHT_META_KEY: &str = "highlighted";

pub(crate) async fn run_search<T: SearchTransport + ?Sized>(
    transport: &T,
    index: &str,
    request: &SearchRequest,
) -> Result<Vec<Document>, StoreError> {
    // Explicit page size wins, then the k of a vector request, else unbounded.
    let target = request.size.or_else(|| request.knn.as_ref().map(|knn| knn.k));

    let mut documents: Vec<Document> = Vec::new();
    let mut page_request = request.clone();
    loop {
        page_request.from = documents.len();
        let page = transport.search(index, &page_request).await?;
        // An empty page cannot advance the offset; stop rather than spin.
        if page.hits.is_empty() {
            break;
        }
        for hit in &page.hits {
            documents.push(document_from_hit(hit)?);
        }
        if target.is_some_and(|t| documents.len() >= t) {
            break;
        }
        if documents.len() as u64 >= page.total {
            break;
        }
    }
    Ok(documents)
}

fn document_from_hit(hit: &Hit) -> Result<Document, StoreError> {
    let mut document: Document = serde_json::from_value(hit.source.clone()).map_err(|e| {
        StoreError::Store(format!("hit '{}' does not deserialize to a document: {e}", hit.id))
    })?;
    if let Some(highlight) = &hit.highlight {
        document.meta.insert(HIGHLIGHT_META_KEY.to_string(), highlight.clone());
    }
    document.score = hit.score;
    Ok(document)
}
