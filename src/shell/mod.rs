// Application shell
// Session state, repository selection and query routing behind the terminal UI


pub mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::chat::{AnthropicClient, ChatEngine, Completer};
use crate::config::Config;
use crate::embeddings::{Embedder, OllamaClient};
use crate::indexer::{Indexer, IndexingStats};
use crate::{RepoChatError, Result};

pub use terminal::run_terminal;

/// What a query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    GenerateComponent,
    Chat,
}

/// Route a query by keyword.
///
/// Any query containing both "generate" and "component", in any case, asks for a
/// component. The match is literal, so "don't generate a component" does too.
#[inline]
pub fn classify_query(query: &str) -> QueryIntent {
    let lowered = query.to_lowercase();
    if lowered.contains("generate") && lowered.contains("component") {
        QueryIntent::GenerateComponent
    } else {
        QueryIntent::Chat
    }
}

/// Check that `input` names an existing directory. A leading `~` is the home directory.
#[inline]
pub fn validate_repository_path(input: &str) -> Result<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RepoChatError::InvalidRepositoryPath(input.to_string()));
    }

    let path = expand_home(trimmed);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(RepoChatError::InvalidRepositoryPath(trimmed.to_string()))
    }
}

fn expand_home(input: &str) -> PathBuf {
    let rest = if input == "~" {
        Some("")
    } else {
        input.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(input),
    }
}

/// Phase of a session, without the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoIndex,
    Indexing,
    Ready,
}

pub enum SessionState {
    NoIndex,
    Indexing,
    Ready(ChatEngine),
}

impl SessionState {
    #[inline]
    pub fn phase(&self) -> Phase {
        match self {
            Self::NoIndex => Phase::NoIndex,
            Self::Indexing => Phase::Indexing,
            Self::Ready(_) => Phase::Ready,
        }
    }
}

/// Output of one query, ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Generated component code
    Code(String),
    /// Chat answer and the files it drew on
    Prose { answer: String, sources: Vec<String> },
    Error(String),
}

/// One interactive session: configuration, service clients and the current index
pub struct Session {
    config: Config,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
    state: SessionState,
    repository: Option<PathBuf>,
}

impl Session {
    #[inline]
    pub fn new(config: Config, embedder: Arc<dyn Embedder>, completer: Arc<dyn Completer>) -> Self {
        Self {
            config,
            embedder,
            completer,
            state: SessionState::NoIndex,
            repository: None,
        }
    }

    /// Build the service clients for `config`.
    ///
    /// The API key is looked up first, so a missing key fails before any other work.
    #[inline]
    pub fn start<F>(config: Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let completer = AnthropicClient::from_lookup(&config.anthropic, lookup)?;
        let embedder = OllamaClient::new(&config.ollama)?;

        Ok(Self::new(config, Arc::new(embedder), Arc::new(completer)))
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Repository behind the current index
    #[inline]
    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    #[inline]
    pub fn engine(&self) -> Option<&ChatEngine> {
        match &self.state {
            SessionState::Ready(engine) => Some(engine),
            _ => None,
        }
    }

    /// Index the repository at `input` and get ready to answer questions about it.
    ///
    /// An invalid path leaves the session as it was. Once indexing starts, any
    /// failure returns the session to `NoIndex`.
    #[inline]
    pub async fn open_repository(&mut self, input: &str) -> Result<IndexingStats> {
        let root = validate_repository_path(input)?;

        self.state = SessionState::Indexing;
        self.repository = None;

        match self.index_and_open(&root).await {
            Ok((engine, stats)) => {
                info!("Session ready for {}", root.display());
                self.state = SessionState::Ready(engine);
                self.repository = Some(root);
                Ok(stats)
            }
            Err(e) => {
                warn!("Could not open {}: {}", root.display(), e);
                self.state = SessionState::NoIndex;
                Err(e)
            }
        }
    }

    async fn index_and_open(&self, root: &Path) -> Result<(ChatEngine, IndexingStats)> {
        let indexer = Indexer::new(self.config.clone(), Arc::clone(&self.embedder));
        let (_, stats) = indexer.create_index(root).await?;

        let engine = ChatEngine::open(
            &self.config,
            Arc::clone(&self.embedder),
            Arc::clone(&self.completer),
        )
        .await?;

        Ok((engine, stats))
    }

    /// Answer one query. Failures are rendered and leave the session usable.
    #[inline]
    pub async fn submit_query(&mut self, query: &str) -> Rendered {
        let SessionState::Ready(engine) = &mut self.state else {
            return Rendered::Error("Please index a repository first.".to_string());
        };

        let query = query.trim();
        match classify_query(query) {
            QueryIntent::GenerateComponent => match engine.generate_component(query).await {
                Ok(code) => Rendered::Code(code),
                Err(e) => Rendered::Error(e.to_string()),
            },
            QueryIntent::Chat => match engine.ask(query).await {
                Ok(reply) => Rendered::Prose {
                    answer: reply.answer,
                    sources: reply.sources,
                },
                Err(e) => Rendered::Error(e.to_string()),
            },
        }
    }
}
