#[cfg(test)]
mod tests;

use super::{ChunkMetadata, EmbeddingRecord, IndexManifest};
use crate::{RepoChatError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "embeddings";

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    path: PathBuf,
    table_name: String,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk_metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

fn db_error<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> RepoChatError + '_ {
    move |e| RepoChatError::Database(format!("{}: {}", context, e))
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.path)
            .field("table_name", &self.table_name)
            .field("vector_dimension", &self.vector_dimension)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Create an empty store at `path`, replacing any index already there
    ///
    /// # Arguments
    /// * `path` - Directory holding the LanceDB tables
    /// * `vector_dimension` - Length of every vector the store will hold
    #[inline]
    pub async fn create(path: &Path, vector_dimension: usize) -> Result<Self> {
        if vector_dimension == 0 {
            return Err(RepoChatError::Database(
                "Vector dimension must be greater than zero".to_string(),
            ));
        }

        std::fs::create_dir_all(path).map_err(|e| {
            RepoChatError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let connection = Self::connect(path).await?;
        let store = Self {
            connection,
            path: path.to_path_buf(),
            table_name: TABLE_NAME.to_string(),
            vector_dimension,
        };

        store.drop_table_if_exists().await?;

        let schema = Self::create_schema(vector_dimension);
        store
            .connection
            .create_empty_table(&store.table_name, schema)
            .execute()
            .await
            .map_err(db_error("Failed to create table"))?;

        info!(
            "Created embeddings table at {} with {} dimensions",
            path.display(),
            vector_dimension
        );
        Ok(store)
    }

    /// Open an existing store. Fails when no index has been written at `path`.
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(RepoChatError::Database(format!(
                "No index found at {}",
                path.display()
            )));
        }

        let connection = Self::connect(path).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(db_error("Failed to list tables"))?;

        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(RepoChatError::Database(format!(
                "No embeddings table in {}",
                path.display()
            )));
        }

        let mut store = Self {
            connection,
            path: path.to_path_buf(),
            table_name: TABLE_NAME.to_string(),
            vector_dimension: 0,
        };
        store.vector_dimension = store.detect_existing_vector_dimension().await?;
        debug!(
            "Opened vector store at {} ({} dimensions)",
            path.display(),
            store.vector_dimension
        );
        Ok(store)
    }

    async fn connect(path: &Path) -> Result<Connection> {
        let uri = path.to_string_lossy();
        debug!("Connecting to LanceDB at {}", uri);
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(db_error("Failed to connect to LanceDB"))
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Manifest written when this index was built
    #[inline]
    pub fn manifest(&self) -> Result<IndexManifest> {
        IndexManifest::load(&self.path)
    }

    #[inline]
    pub fn write_manifest(&self, manifest: &IndexManifest) -> Result<()> {
        manifest.save(&self.path)
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(db_error("Failed to open existing table"))?;

        let schema = table
            .schema()
            .await
            .map_err(db_error("Failed to get table schema"))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RepoChatError::Database(
                    "Could not find vector column or determine dimension".to_string(),
                )
            })
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("source_path", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("start_offset", DataType::UInt32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Store multiple embeddings in a batch
    ///
    /// Every vector must match the dimension the store was created with.
    #[inline]
    pub async fn store_embeddings_batch(&self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        let record_batch = self.create_record_batch(records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(db_error("Failed to open table"))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(db_error("Failed to insert embeddings"))?;

        debug!("Stored {} embeddings", records.len());
        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch> {
        let len = records.len();
        let vector_dim = self.vector_dimension;

        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RepoChatError::Database(format!(
                "Embedding {} has {} dimensions, store expects {}",
                bad.id,
                bad.vector.len(),
                vector_dim
            )));
        }

        let mut ids = Vec::with_capacity(len);
        let mut source_paths = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut start_offsets = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);

        for record in records {
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            source_paths.push(record.metadata.source_path.as_str());
            chunk_indices.push(record.metadata.chunk_index);
            start_offsets.push(record.metadata.start_offset);
            contents.push(record.metadata.content.as_str());
            created_ats.push(record.metadata.created_at.as_str());
        }

        let schema = Self::create_schema(vector_dim);

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    RepoChatError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(source_paths)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(UInt32Array::from(start_offsets)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| RepoChatError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for the `limit` nearest chunks to `query_vector`, closest first
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if query_vector.len() != self.vector_dimension {
            return Err(RepoChatError::Database(format!(
                "Query vector has {} dimensions, index has {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(db_error("Failed to open table"))?;

        let results = table
            .vector_search(query_vector)
            .map_err(db_error("Failed to create vector search"))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(db_error("Failed to execute search"))?;

        self.parse_search_results_stream(results).await
    }

    /// Parse search results from LanceDB stream into SearchResult structs
    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(db_error("Failed to read result stream"))?
        {
            search_results.extend(Self::parse_search_batch(&batch_result)?);
        }

        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let source_paths = string_column(batch, "source_path")?;
        let chunk_indices = u32_column(batch, "chunk_index")?;
        let start_offsets = u32_column(batch, "start_offset")?;
        let contents = string_column(batch, "content")?;
        let created_ats = string_column(batch, "created_at")?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let results = (0..batch.num_rows())
            .map(|row| {
                let distance =
                    distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                SearchResult {
                    chunk_metadata: ChunkMetadata {
                        source_path: source_paths.value(row).to_string(),
                        chunk_index: chunk_indices.value(row),
                        start_offset: start_offsets.value(row),
                        content: contents.value(row).to_string(),
                        created_at: created_ats.value(row).to_string(),
                    },
                    // Higher is better
                    similarity_score: 1.0 - distance,
                    distance,
                }
            })
            .collect();

        Ok(results)
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(db_error("Failed to open table"))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(db_error("Failed to count rows"))?;

        Ok(count as u64)
    }

    /// Drop the embeddings table if it exists
    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(db_error("Failed to list tables for drop"))?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing embeddings table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(db_error("Failed to drop table"))?;
        }

        Ok(())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RepoChatError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RepoChatError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RepoChatError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RepoChatError::Database(format!("Invalid {} column type", name)))
}
