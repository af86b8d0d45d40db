
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, error, info};

use super::{Completer, CompletionRequest, Message, RetrievedChunk, Retriever};
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::Embedder;
use crate::{RepoChatError, Result};

const SYSTEM_PROMPT: &str = "You are an assistant that answers questions about a software repository. \
Use the repository excerpts provided with each question and the earlier conversation. \
If the excerpts do not contain the answer, say so instead of guessing.";

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Ordered record of the answered questions in a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The turns as alternating user and assistant messages
    #[inline]
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .flat_map(|turn| {
                [
                    Message::user(turn.question.clone()),
                    Message::assistant(turn.answer.clone()),
                ]
            })
            .collect()
    }
}

/// An answer and the files it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    /// Source paths of the retrieved chunks, most relevant first, without duplicates
    pub sources: Vec<String>,
}

/// Retrieves chunks from the vector store by embedding the query
pub struct StoreRetriever {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
}

impl StoreRetriever {
    #[inline]
    pub fn new(store: VectorStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl Retriever for StoreRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievedChunk>> {
        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let query_vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| RepoChatError::Embedding(format!("Embedding task failed: {}", e)))??;

        let results = self.store.search_similar(&query_vector, limit).await?;

        Ok(results
            .into_iter()
            .map(|result| RetrievedChunk {
                source_path: result.chunk_metadata.source_path,
                content: result.chunk_metadata.content,
                chunk_index: result.chunk_metadata.chunk_index,
                score: result.similarity_score,
            })
            .collect())
    }
}

/// Answers questions about an indexed repository, remembering earlier turns
pub struct ChatEngine {
    retriever: Box<dyn Retriever>,
    completer: Arc<dyn Completer>,
    top_k: usize,
    memory: ConversationMemory,
}

impl ChatEngine {
    #[inline]
    pub fn new(retriever: Box<dyn Retriever>, completer: Arc<dyn Completer>, top_k: usize) -> Self {
        Self {
            retriever,
            completer,
            top_k: top_k.max(1),
            memory: ConversationMemory::new(),
        }
    }

    /// Open the index written by the indexer.
    ///
    /// Fails when the index was embedded with a different model than `embedder`.
    #[inline]
    pub async fn open(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
    ) -> Result<Self> {
        let store = VectorStore::open(&config.vector_database_path()).await?;
        let manifest = store.manifest()?;

        if manifest.embedding_model != embedder.model() {
            return Err(RepoChatError::EmbeddingModelMismatch {
                indexed: manifest.embedding_model,
                configured: embedder.model().to_string(),
            });
        }

        info!(
            "Opened index of {} ({} chunks, model {}), answering with {}",
            manifest.repository_root.display(),
            manifest.chunks,
            manifest.embedding_model,
            completer.model()
        );

        Ok(Self::new(
            Box::new(StoreRetriever::new(store, embedder)),
            completer,
            config.retrieval.top_k,
        ))
    }

    #[inline]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `query` and remember the exchange
    #[inline]
    pub async fn chat(&mut self, query: &str) -> Result<String> {
        self.ask(query).await.map(|reply| reply.answer)
    }

    /// Answer `query` with the sources it was grounded on.
    ///
    /// Memory only changes when the answer succeeds.
    #[inline]
    pub async fn ask(&mut self, query: &str) -> Result<ChatReply> {
        match self.answer(query).await {
            Ok(reply) => {
                self.memory.push(query, reply.answer.clone());
                Ok(reply)
            }
            Err(e) => {
                error!("Query failed: {}", e);
                Err(e)
            }
        }
    }

    async fn answer(&self, query: &str) -> Result<ChatReply> {
        let chunks = self.retriever.retrieve(query, self.top_k).await?;
        debug!("Retrieved {} chunks for query", chunks.len());

        let request = self.build_request(query, &chunks);
        let completer = Arc::clone(&self.completer);
        let answer = tokio::task::spawn_blocking(move || completer.complete(&request))
            .await
            .map_err(|e| RepoChatError::Completion(format!("Completion task failed: {}", e)))??;

        let sources = chunks
            .into_iter()
            .map(|chunk| chunk.source_path)
            .unique()
            .collect();

        Ok(ChatReply { answer, sources })
    }

    fn build_request(&self, query: &str, chunks: &[RetrievedChunk]) -> CompletionRequest {
        let mut messages = self.memory.to_messages();
        messages.push(Message::user(question_with_context(query, chunks)));

        CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            messages,
            temperature: 0.0,
            max_tokens: self.completer.max_tokens(),
        }
    }
}

fn question_with_context(query: &str, chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return format!("No repository excerpts matched this question.\n\nQuestion: {}", query);
    }

    let context = chunks
        .iter()
        .map(|chunk| format!("File: {}\n{}", chunk.source_path, chunk.content))
        .join("\n\n---\n\n");

    format!(
        "Repository excerpts:\n\n{}\n\n---\n\nQuestion: {}",
        context, query
    )
}
