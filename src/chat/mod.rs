// Chat module
// Retrieval-augmented conversation over an indexed repository

pub mod anthropic;
pub mod engine;
pub mod generator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use anthropic::AnthropicClient;
pub use engine::{ChatEngine, ChatReply, ConversationMemory, StoreRetriever, Turn};
pub use generator::component_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One call to a chat-completion model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    /// Alternating user and assistant messages, ending with a user message
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A chat-completion model
pub trait Completer: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model identifier, for logging
    fn model(&self) -> &str;

    /// Upper bound on the length of one answer
    fn max_tokens(&self) -> u32;
}

/// A chunk of repository text returned for a query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub source_path: String,
    pub content: String,
    pub chunk_index: u32,
    /// Higher is more relevant
    pub score: f32,
}

/// Finds the chunks most relevant to a query
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievedChunk>>;
}
