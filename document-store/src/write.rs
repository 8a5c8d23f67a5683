//! Bulk write translation and reconciliation.

use document_model::{Document, DuplicatePolicy};
use tracing::warn;

use crate::transport::{BulkAction, BulkReport, BulkVerb, VERSION_CONFLICT};
use crate::StoreError;

/// Validates the batch and translates it into bulk actions.
///
/// Returns the actions together with the resolved policy (`None` resolves to
/// `Fail`). Runs entirely before any network call.
pub(crate) fn build_actions(
    documents: &[Document],
    policy: DuplicatePolicy,
) -> Result<(Vec<BulkAction>, DuplicatePolicy), StoreError> {
    for document in documents {
        if document.id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "every document in a write batch must carry a non-empty id".into(),
            ));
        }
    }

    let policy = match policy {
        DuplicatePolicy::None => DuplicatePolicy::Fail,
        other => other,
    };
    let verb = match policy {
        DuplicatePolicy::Overwrite => BulkVerb::Index,
        _ => BulkVerb::Create,
    };

    let mut actions = Vec::with_capacity(documents.len());
    for document in documents {
        let mut source = serde_json::to_value(document)
            .map_err(|e| StoreError::Store(format!("document '{}': {e}", document.id)))?;
        if let Some(fields) = source.as_object_mut() {
            // Relevance scores only exist on retrieval.
            fields.remove("score");
            if fields.remove("sparse_embedding").is_some() {
                warn!(
                    doc_id = %document.id,
                    "the backend does not support sparse embeddings; dropping the field"
                );
            }
        }
        actions.push(BulkAction { verb, id: document.id.clone(), source: Some(source) });
    }
    Ok((actions, policy))
}

/// Interprets per-item bulk failures against the duplicate policy.
///
/// The batch has already been fully submitted at this point; at most one
/// error is raised per call, duplicates taking priority.
pub(crate) fn reconcile(report: &BulkReport, policy: DuplicatePolicy) -> Result<usize, StoreError> {
    let mut duplicate_ids = Vec::new();
    let mut other_failures = Vec::new();
    for item in &report.errors {
        match policy {
            DuplicatePolicy::Fail if item.kind == VERSION_CONFLICT => {
                duplicate_ids.push(item.id.clone());
            }
            DuplicatePolicy::Skip if item.kind == VERSION_CONFLICT => {}
            _ => other_failures.push(format!("{} ({}): {}", item.id, item.kind, item.reason)),
        }
    }

    if !duplicate_ids.is_empty() {
        return Err(StoreError::Duplicate { ids: duplicate_ids });
    }
    if !other_failures.is_empty() {
        return Err(StoreError::Store(format!(
            "failed to write documents: {}",
            other_failures.join("; ")
        )));
    }
    Ok(report.written)
}
