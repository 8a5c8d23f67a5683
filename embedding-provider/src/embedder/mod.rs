use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("input text must not be empty")]
    EmptyInput,
    #[error("embedding backend error: {0}")]
    Backend(String),
}

/// The narrow contract the document store's vector strategy consumes: given
/// text, return a fixed-length numeric vector. How the vector is produced
/// (model loading, inference) is the implementation's concern.
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
