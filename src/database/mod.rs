// Database module
// LanceDB vector storage for the repository index

pub mod lancedb;

pub use lancedb::vector_store::{SearchResult, VectorStore};
pub use lancedb::{ChunkMetadata, EmbeddingRecord, IndexManifest};
