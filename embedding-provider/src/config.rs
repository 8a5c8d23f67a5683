use std::path::PathBuf;

/// Configuration surface for a text embedder implementation.
///
/// Only the affix wrapping is interpreted here; everything else is passed to
/// the implementation (model selection, cache location, parallelism hints).
#[derive(Debug, Clone)]
pub struct TextEmbedderConfig {
    /// Identifier of the embedding model to load.
    pub model_id: String,
    /// Where the implementation may cache model artifacts.
    pub cache_dir: Option<PathBuf>,
    /// Threads available to a single inference call.
    pub threads: Option<usize>,
    /// Data-parallel workers for batch encoding.
    pub parallel: Option<usize>,
    /// Inputs encoded per inference call.
    pub batch_size: usize,
    /// Text prepended to every input before embedding.
    pub prefix: String,
    /// Text appended to every input before embedding.
    pub suffix: String,
}

impl Default for TextEmbedderConfig {
    fn default() -> Self {
        Self {
            model_id: "BAAI/bge-small-en-v1.5".to_string(),
            cache_dir: None,
            threads: None,
            parallel: None,
            batch_size: 256,
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

impl TextEmbedderConfig {
    /// Wraps an input as `prefix + text + suffix`.
    pub fn apply_affixes(&self, text: &str) -> String {
        let mut wrapped = String::with_capacity(self.prefix.len() + text.len() + self.suffix.len());
        wrapped.push_str(&self.prefix);
        wrapped.push_str(text);
        wrapped.push_str(&self.suffix);
        wrapped
    }
}
