// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings


pub mod vector_store;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Name of the manifest written next to the embeddings table
pub const MANIFEST_FILE: &str = "manifest.toml";

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding (384 dimensions for all-minilm)
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source file, relative to the repository root
    pub source_path: String,
    /// Index of this chunk within its file
    pub chunk_index: u32,
    /// Byte offset of the chunk within its file
    pub start_offset: u32,
    /// The actual text content of the chunk
    pub content: String,
    /// Timestamp when this embedding was created
    pub created_at: String,
}

/// Describes how an index was built.
///
/// Queries must be embedded with the same model as the indexed chunks, so the
/// model is recorded here and checked whenever the index is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub vector_dimension: usize,
    pub repository_root: PathBuf,
    pub documents: usize,
    pub chunks: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn load(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read index manifest {}", path.display()))?;
        let manifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse index manifest {}", path.display()))?;
        Ok(manifest)
    }

    #[inline]
    pub fn save(&self, store_dir: &Path) -> Result<()> {
        let path = store_dir.join(MANIFEST_FILE);
        let content = toml::to_string_pretty(self).context("Failed to serialize index manifest")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write index manifest {}", path.display()))?;
        Ok(())
    }
}
