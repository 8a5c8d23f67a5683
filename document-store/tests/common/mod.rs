//! In-memory backend standing in for a real transport, plus a deterministic
//! test embedder. Keeps insertion order so "backend order" is observable.

use std::sync::Mutex;

use async_trait::async_trait;
use document_store::transport::VERSION_CONFLICT;
use document_store::{
    BulkAction, BulkItemError, BulkReport, BulkVerb, Hit, SearchPage, SearchRequest,
    SearchTransport, TransportError,
};
use embedding_provider::embedder::{Embedder, EmbedderError};
use serde_json::{json, Value};

/// Page size the fake backend applies when a request carries no explicit size.
const BACKEND_PAGE_SIZE: usize = 10;

#[derive(Default)]
struct State {
    /// Insertion-ordered records: (id, stored source).
    docs: Vec<(String, Value)>,
    index_exists: bool,
    schema: Option<Value>,
    pings: usize,
    searches: Vec<SearchRequest>,
}

pub struct MemoryTransport {
    state: Mutex<State>,
    unreachable: bool,
    highlight: bool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self { state: Mutex::new(State::default()), unreachable: false, highlight: false }
    }
}

#[allow(dead_code)]
impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self { unreachable: true, ..Self::default() }
    }

    pub fn with_highlight() -> Self {
        Self { highlight: true, ..Self::default() }
    }

    pub fn ping_count(&self) -> usize {
        self.state.lock().unwrap().pings
    }

    pub fn recorded_searches(&self) -> Vec<SearchRequest> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn stored(&self, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.docs.iter().find(|(doc_id, _)| doc_id == id).map(|(_, source)| source.clone())
    }

    pub fn created_schema(&self) -> Option<Value> {
        self.state.lock().unwrap().schema.clone()
    }
}

/// Resolves a dotted field path (`meta.category`) inside a stored source.
fn lookup<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn range_matches(stored: &Value, bounds: &Value) -> bool {
    let cmp = |bound: &Value| -> Option<std::cmp::Ordering> {
        match (stored, bound) {
            (Value::Number(a), Value::Number(b)) => {
                a.as_f64().unwrap().partial_cmp(&b.as_f64().unwrap())
            }
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    };
    for (bound_kind, bound_value) in bounds.as_object().unwrap() {
        let Some(ordering) = cmp(bound_value) else { return false };
        let ok = match bound_kind.as_str() {
            "gt" => ordering == std::cmp::Ordering::Greater,
            "gte" => ordering != std::cmp::Ordering::Less,
            "lt" => ordering == std::cmp::Ordering::Less,
            "lte" => ordering != std::cmp::Ordering::Greater,
            _ => false,
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Evaluates the native clause shapes the store's normalizer produces.
fn eval_clause(clause: &Value, source: &Value) -> bool {
    let fields = clause.as_object().expect("clause is an object");

    if let Some(term) = fields.get("term") {
        let (field, value) = term.as_object().unwrap().iter().next().unwrap();
        return lookup(source, field) == Some(value);
    }
    if let Some(terms) = fields.get("terms") {
        let (field, values) = terms.as_object().unwrap().iter().next().unwrap();
        return match lookup(source, field) {
            Some(stored) => values.as_array().unwrap().contains(stored),
            None => false,
        };
    }
    if let Some(range) = fields.get("range") {
        let (field, bounds) = range.as_object().unwrap().iter().next().unwrap();
        return match lookup(source, field) {
            Some(stored) => range_matches(stored, bounds),
            None => false,
        };
    }
    if let Some(exists) = fields.get("exists") {
        let field = exists["field"].as_str().unwrap();
        return matches!(lookup(source, field), Some(v) if !v.is_null());
    }
    if let Some(boolean) = fields.get("bool") {
        if let Some(must) = boolean.get("must") {
            if !must.as_array().unwrap().iter().all(|c| eval_clause(c, source)) {
                return false;
            }
        }
        if let Some(filter) = boolean.get("filter") {
            if !filter.as_array().unwrap().iter().all(|c| eval_clause(c, source)) {
                return false;
            }
        }
        if let Some(should) = boolean.get("should") {
            if !should.as_array().unwrap().iter().any(|c| eval_clause(c, source)) {
                return false;
            }
        }
        if let Some(must_not) = boolean.get("must_not") {
            let negated = match must_not {
                Value::Array(clauses) => clauses.iter().any(|c| eval_clause(c, source)),
                single => eval_clause(single, source),
            };
            if negated {
                return false;
            }
        }
        return true;
    }
    true
}

/// Term-overlap stand-in for lexical scoring: one point per query term
/// contained in the content.
fn lexical_score(query: &str, source: &Value) -> Option<f32> {
    let content = source.get("content")?.as_str()?.to_lowercase();
    let mut matched = 0usize;
    for term in query.to_lowercase().split_whitespace() {
        if content.contains(term) {
            matched += 1;
        }
    }
    (matched > 0).then_some(matched as f32)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl SearchTransport for MemoryTransport {
    async fn ping(&self) -> Result<(), TransportError> {
        if self.unreachable {
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        self.state.lock().unwrap().pings += 1;
        Ok(())
    }

    async fn index_exists(&self, _index: &str) -> Result<bool, TransportError> {
        Ok(self.state.lock().unwrap().index_exists)
    }

    async fn create_index(&self, _index: &str, schema: &Value) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.index_exists = true;
        state.schema = Some(schema.clone());
        Ok(())
    }

    async fn count(&self, _index: &str) -> Result<u64, TransportError> {
        Ok(self.state.lock().unwrap().docs.len() as u64)
    }

    async fn search(
        &self,
        _index: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(request.clone());

        // (id, source, score, highlight)
        let mut matched: Vec<(String, Value, Option<f32>, Option<Value>)> = Vec::new();

        if let Some(knn) = &request.knn {
            for (id, source) in &state.docs {
                if let Some(filter) = &knn.filter {
                    if !eval_clause(filter, source) {
                        continue;
                    }
                }
                let Some(embedding) = source.get("embedding").and_then(Value::as_array) else {
                    continue;
                };
                let stored: Vec<f32> =
                    embedding.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
                let score = dot(&knn.query_vector, &stored);
                matched.push((id.clone(), source.clone(), Some(score), None));
            }
            matched.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
            matched.truncate(knn.k);
        } else if let Some(query) = &request.query {
            let boolean = &query["bool"];
            for (id, source) in &state.docs {
                if let Some(filter) = boolean.get("filter") {
                    let all = filter
                        .as_array()
                        .unwrap()
                        .iter()
                        .all(|clause| eval_clause(clause, source));
                    if !all {
                        continue;
                    }
                }
                if let Some(must) = boolean.get("must") {
                    let terms = must[0]["multi_match"]["query"].as_str().unwrap_or("");
                    let Some(score) = lexical_score(terms, source) else { continue };
                    let highlight = self
                        .highlight
                        .then(|| json!({"content": [format!("<em>{terms}</em>")]}));
                    matched.push((id.clone(), source.clone(), Some(score), highlight));
                } else {
                    matched.push((id.clone(), source.clone(), Some(1.0), None));
                }
            }
            if boolean.get("must").is_some() {
                matched.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
            }
        } else {
            for (id, source) in &state.docs {
                matched.push((id.clone(), source.clone(), Some(1.0), None));
            }
        }

        let total = matched.len() as u64;
        let page_size = request.size.unwrap_or(BACKEND_PAGE_SIZE);
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(page_size)
            .map(|(id, source, score, highlight)| Hit { id, source, score, highlight })
            .collect();
        Ok(SearchPage { hits, total })
    }

    async fn bulk(
        &self,
        _index: &str,
        actions: Vec<BulkAction>,
        _refresh: bool,
    ) -> Result<BulkReport, TransportError> {
        let mut state = self.state.lock().unwrap();
        let mut report = BulkReport::default();
        for action in actions {
            let existing = state.docs.iter().position(|(id, _)| *id == action.id);
            match action.verb {
                BulkVerb::Create => {
                    if existing.is_some() {
                        report.errors.push(BulkItemError {
                            id: action.id,
                            kind: VERSION_CONFLICT.into(),
                            reason: "document already exists".into(),
                        });
                    } else {
                        state.docs.push((action.id, action.source.unwrap()));
                        report.written += 1;
                    }
                }
                BulkVerb::Index => {
                    let source = action.source.unwrap();
                    match existing {
                        Some(position) => state.docs[position].1 = source,
                        None => state.docs.push((action.id, source)),
                    }
                    report.written += 1;
                }
                BulkVerb::Delete => {
                    if let Some(position) = existing {
                        state.docs.remove(position);
                        report.written += 1;
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Deterministic embedder for tests: folds input bytes into a fixed-length
/// unit vector. Identical texts embed identically, and under dot-product
/// scoring a text is always closest to itself.
pub struct FoldEmbedder {
    pub dimension: usize,
}

impl Embedder for FoldEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        if text.is_empty() {
            return Err(EmbedderError::EmptyInput);
        }
        let mut vector = vec![0.0f32; self.dimension];
        for (position, byte) in text.bytes().enumerate() {
            vector[position % self.dimension] += f32::from(byte) / 255.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        for v in &mut vector {
            *v /= norm;
        }
        Ok(vector)
    }
}
