// Embeddings module
// Embedding service client and the recursive text splitter

pub mod chunking;
pub mod ollama;

pub use chunking::{CHUNK_OVERLAP, CHUNK_SIZE, TextChunk, TextSplitter};
pub use ollama::OllamaClient;

use crate::Result;

/// Turns text into embedding vectors.
///
/// Queries and chunks must be embedded by the same model, so implementations
/// report the model identifier they use.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn model(&self) -> &str;
}
