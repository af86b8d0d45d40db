// Indexer module
// Walks a repository, splits its text files into chunks and stores their embeddings


pub mod loader;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::database::{ChunkMetadata, EmbeddingRecord, IndexManifest, VectorStore};
use crate::embeddings::{Embedder, TextChunk, TextSplitter};
use crate::{RepoChatError, Result};

pub use loader::{Document, TEXT_EXTENSIONS, is_text_file, load_document};

/// Builds the vector index for one repository
pub struct Indexer {
    config: Config,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
}

/// Statistics about one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingStats {
    /// Regular files found under the root
    pub files_seen: usize,
    /// Files skipped because of their extension
    pub files_filtered: usize,
    /// Allow-listed files that could not be read or decoded
    pub load_failures: usize,
    pub documents_loaded: usize,
    pub chunks_created: usize,
    pub embeddings_stored: usize,
    pub elapsed: Duration,
}

/// A chunk waiting for its embedding
struct PendingChunk {
    source_path: String,
    chunk: TextChunk,
}

impl Indexer {
    #[inline]
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            embedder,
            splitter: TextSplitter::default(),
        }
    }

    /// Where the index is written
    #[inline]
    pub fn store_path(&self) -> PathBuf {
        self.config.vector_database_path()
    }

    /// Index every text file under `root`, replacing any previous index.
    ///
    /// Nothing is written when the repository yields no chunks.
    #[inline]
    pub async fn create_index(&self, root: &Path) -> Result<(VectorStore, IndexingStats)> {
        let started = Instant::now();

        if !root.is_dir() {
            return Err(RepoChatError::InvalidRepository(root.to_path_buf()));
        }

        info!("Indexing repository at {}", root.display());

        let mut stats = IndexingStats::default();
        let documents = self.load_documents(root, &mut stats);
        if documents.is_empty() {
            warn!("No loadable text files under {}", root.display());
            return Err(RepoChatError::EmptyRepository(root.to_path_buf()));
        }

        let pending: Vec<PendingChunk> = documents
            .iter()
            .flat_map(|document| {
                self.splitter
                    .split(&document.content)
                    .into_iter()
                    .map(|chunk| PendingChunk {
                        source_path: document.relative_path.clone(),
                        chunk,
                    })
            })
            .collect();
        stats.chunks_created = pending.len();

        if pending.is_empty() {
            warn!(
                "{} documents loaded but none contained text",
                stats.documents_loaded
            );
            return Err(RepoChatError::EmptyRepository(root.to_path_buf()));
        }

        info!(
            "Split {} documents into {} chunks",
            stats.documents_loaded, stats.chunks_created
        );

        let vectors = self.embed_chunks(&pending).await?;
        let vector_dimension = vectors.first().map_or(0, Vec::len);

        let created_at = Utc::now();
        let records: Vec<EmbeddingRecord> = pending
            .into_iter()
            .zip(vectors)
            .map(|(pending, vector)| EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                metadata: ChunkMetadata {
                    source_path: pending.source_path,
                    chunk_index: u32::try_from(pending.chunk.chunk_index).unwrap_or(u32::MAX),
                    start_offset: u32::try_from(pending.chunk.start_offset).unwrap_or(u32::MAX),
                    content: pending.chunk.content,
                    created_at: created_at.to_rfc3339(),
                },
            })
            .collect();

        let store = VectorStore::create(&self.store_path(), vector_dimension).await?;
        store.store_embeddings_batch(&records).await?;
        stats.embeddings_stored = records.len();

        store.write_manifest(&IndexManifest {
            embedding_model: self.embedder.model().to_string(),
            vector_dimension,
            repository_root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            documents: stats.documents_loaded,
            chunks: stats.chunks_created,
            created_at,
        })?;

        stats.elapsed = started.elapsed();
        info!(
            "Indexed {} chunks from {} documents in {:.2?} ({} files skipped, {} failed to load)",
            stats.embeddings_stored,
            stats.documents_loaded,
            stats.elapsed,
            stats.files_filtered,
            stats.load_failures
        );

        Ok((store, stats))
    }

    /// Walk `root` and load every allow-listed file. Failures are logged and counted.
    fn load_documents(&self, root: &Path, stats: &mut IndexingStats) -> Vec<Document> {
        let store_dir = self.store_path().canonicalize().ok();
        let mut documents = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            // Never index our own store when it lives inside the repository
            .filter_entry(|entry| {
                store_dir.as_ref().is_none_or(|store| {
                    !entry.file_type().is_dir()
                        || entry.path().canonicalize().map_or(true, |p| &p != store)
                })
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            stats.files_seen += 1;

            let path = entry.path();
            if !is_text_file(path) {
                debug!("Skipping {}", path.display());
                stats.files_filtered += 1;
                continue;
            }

            match load_document(root, path) {
                Ok(document) => {
                    stats.documents_loaded += 1;
                    documents.push(document);
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", path.display(), e);
                    stats.load_failures += 1;
                }
            }
        }

        documents
    }

    /// Embed chunk contents in batches of the configured size, preserving order
    async fn embed_chunks(&self, pending: &[PendingChunk]) -> Result<Vec<Vec<f32>>> {
        let batch_size = (self.config.ollama.batch_size as usize).max(1);
        let total_batches = pending.len().div_ceil(batch_size);
        let mut vectors = Vec::with_capacity(pending.len());

        for (number, batch) in pending.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|p| p.chunk.content.clone()).collect();
            let embedder = Arc::clone(&self.embedder);

            let embeddings = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
                .await
                .map_err(|e| RepoChatError::Embedding(format!("Embedding task failed: {}", e)))??;

            if embeddings.len() != batch.len() {
                return Err(RepoChatError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            debug!("Embedded batch {}/{}", number + 1, total_batches);
            vectors.extend(embeddings);
        }

        Ok(vectors)
    }
}
