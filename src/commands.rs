use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::AnthropicClient;
use crate::config::{Config, get_config_dir};
use crate::embeddings::OllamaClient;
use crate::indexer::{Indexer, IndexingStats};
use crate::shell::{Session, run_terminal, validate_repository_path};

/// Load configuration from `config_dir`, or from the default directory
#[inline]
pub fn load_config(config_dir: Option<&Path>) -> Result<Config> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => get_config_dir().context("Failed to determine configuration directory")?,
    };
    Config::load(&dir).with_context(|| format!("Failed to load configuration from {}", dir.display()))
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Start an interactive chat session, indexing `repository` first when given
#[inline]
pub async fn run_chat(config: Config, repository: Option<String>) -> Result<()> {
    let session = Session::start(config, env_lookup)?;
    check_embedding_service(session.config());

    run_terminal(session, repository).await
}

/// Index the repository at `path` and print what was stored
#[inline]
pub async fn index_repository(config: Config, path: &str) -> Result<()> {
    // Chat needs the key later, so refuse to build an index nobody can query
    AnthropicClient::from_env(&config.anthropic)?;

    let root = validate_repository_path(path)?;
    check_embedding_service(&config);

    let embedder = OllamaClient::new(&config.ollama)?;
    let indexer = Indexer::new(config, Arc::new(embedder));

    info!("Indexing {}", root.display());
    let (store, stats) = indexer.create_index(&root).await?;

    print_stats(&stats);
    println!("  Index: {}", style(store.path().display()).cyan());

    Ok(())
}

fn print_stats(stats: &IndexingStats) {
    println!("{}", style("Indexing complete").bold().green());
    println!("  Files found: {}", stats.files_seen);
    println!("  Skipped by extension: {}", stats.files_filtered);
    println!("  Failed to load: {}", stats.load_failures);
    println!("  Documents indexed: {}", stats.documents_loaded);
    println!("  Chunks stored: {}", stats.embeddings_stored);
    println!("  Duration: {:.2?}", stats.elapsed);
}

/// Warn early when the embedding service or model is unavailable
fn check_embedding_service(config: &Config) {
    let result = OllamaClient::new(&config.ollama).and_then(|client| client.health_check());
    if let Err(e) = result {
        warn!("Embedding service check failed: {:#}", e);
        eprintln!(
            "{} {:#}",
            style("⚠ Embedding service unavailable:").yellow(),
            e
        );
    }
}
