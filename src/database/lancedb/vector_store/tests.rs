use super::*;
use chrono::Utc;
use tempfile::TempDir;

const DIMENSION: usize = 5;

fn store_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("repo_chat_db")
}

fn create_test_embedding_record(index: u32, source_path: &str) -> EmbeddingRecord {
    // Same dimension for every record, shifted by the index so vectors differ
    let mut test_vector = vec![0.1, 0.2, 0.3, 0.4, 0.5];
    for (i, val) in test_vector.iter_mut().enumerate() {
        *val += (index as f32).mul_add(0.1, i as f32 * 0.001);
    }

    EmbeddingRecord {
        id: format!("chunk-{}", index),
        vector: test_vector,
        metadata: ChunkMetadata {
            source_path: source_path.to_string(),
            chunk_index: index,
            start_offset: index * 800,
            content: format!("This is test content for chunk {}", index),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        },
    }
}

#[tokio::test]
async fn create_makes_empty_table() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let store = VectorStore::create(&store_path(&temp_dir), DIMENSION)
        .await
        .expect("should create vector store");

    assert_eq!(store.table_name, "embeddings");
    assert_eq!(store.vector_dimension(), DIMENSION);
    assert_eq!(store.count_embeddings().await.expect("count"), 0);
}

#[tokio::test]
async fn zero_dimension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = store_path(&temp_dir);

    assert!(VectorStore::create(&path, 0).await.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn store_batch_embeddings() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(&store_path(&temp_dir), DIMENSION)
        .await
        .expect("should create vector store");

    let records = vec![
        create_test_embedding_record(0, "src/a.rs"),
        create_test_embedding_record(1, "src/a.rs"),
        create_test_embedding_record(2, "src/b.rs"),
    ];

    store
        .store_embeddings_batch(&records)
        .await
        .expect("should store embeddings");

    let count = store
        .count_embeddings()
        .await
        .expect("should count embeddings successfully");
    assert_eq!(count, 3);
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(&store_path(&temp_dir), DIMENSION)
        .await
        .expect("should create vector store");

    let mut record = create_test_embedding_record(0, "src/a.rs");
    record.vector.push(1.0);

    let result = store.store_embeddings_batch(&[record]).await;
    assert!(matches!(result, Err(RepoChatError::Database(_))));
}

#[tokio::test]
async fn search_returns_closest_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(&store_path(&temp_dir), DIMENSION)
        .await
        .expect("should create vector store");

    let records: Vec<EmbeddingRecord> = (0..6)
        .map(|i| create_test_embedding_record(i, &format!("file{}.py", i)))
        .collect();
    store
        .store_embeddings_batch(&records)
        .await
        .expect("should store embeddings successfully");

    let query_vector = records[4].vector.clone();
    let results = store
        .search_similar(&query_vector, 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk_metadata.source_path, "file4.py");
    assert_eq!(results[0].chunk_metadata.start_offset, 3200);
    assert!(results[0].distance.abs() < 1e-6);
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn search_rejects_mismatched_query() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(&store_path(&temp_dir), DIMENSION)
        .await
        .expect("should create vector store");

    let result = store.search_similar(&[0.1, 0.2], 4).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn open_detects_dimension_and_rows() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = store_path(&temp_dir);
    {
        let store = VectorStore::create(&path, DIMENSION)
            .await
            .expect("should create vector store");
        store
            .store_embeddings_batch(&[create_test_embedding_record(0, "README.md")])
            .await
            .expect("store");
    }

    let reopened = VectorStore::open(&path).await.expect("should open store");
    assert_eq!(reopened.vector_dimension(), DIMENSION);
    assert_eq!(reopened.count_embeddings().await.expect("count"), 1);
}

#[tokio::test]
async fn open_without_index_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let missing = VectorStore::open(&store_path(&temp_dir)).await;
    assert!(matches!(missing, Err(RepoChatError::Database(_))));

    // An existing directory without the table is not an index either
    let empty = VectorStore::open(temp_dir.path()).await;
    assert!(matches!(empty, Err(RepoChatError::Database(_))));
}

#[tokio::test]
async fn create_replaces_previous_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = store_path(&temp_dir);

    let first = VectorStore::create(&path, DIMENSION)
        .await
        .expect("should create vector store");
    first
        .store_embeddings_batch(&[
            create_test_embedding_record(0, "old.md"),
            create_test_embedding_record(1, "old.md"),
        ])
        .await
        .expect("store");
    drop(first);

    let second = VectorStore::create(&path, 3).await.expect("recreate");
    assert_eq!(second.count_embeddings().await.expect("count"), 0);
    assert_eq!(second.vector_dimension(), 3);
}

#[tokio::test]
async fn manifest_lives_next_to_table() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = store_path(&temp_dir);
    let store = VectorStore::create(&path, DIMENSION)
        .await
        .expect("should create vector store");

    let manifest = IndexManifest {
        embedding_model: "all-minilm".to_string(),
        vector_dimension: DIMENSION,
        repository_root: temp_dir.path().to_path_buf(),
        documents: 1,
        chunks: 1,
        created_at: Utc::now(),
    };
    store.write_manifest(&manifest).expect("write manifest");

    let reopened = VectorStore::open(&path).await.expect("open");
    assert_eq!(reopened.manifest().expect("manifest"), manifest);
}

#[tokio::test]
async fn empty_batch_handling() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(&store_path(&temp_dir), DIMENSION)
        .await
        .expect("should create vector store");

    let result = store.store_embeddings_batch(&[]).await;
    assert!(result.is_ok(), "Should handle empty batch gracefully");

    let count = store
        .count_embeddings()
        .await
        .expect("should count embeddings successfully");
    assert_eq!(count, 0);
}
