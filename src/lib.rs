use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepoChatError>;

#[derive(Error, Debug)]
pub enum RepoChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{var} is not set. Add it to your environment or a .env file")]
    MissingCredential { var: &'static str },

    #[error("Invalid directory path: {0}. Please enter a valid path.")]
    InvalidRepositoryPath(String),

    #[error("Not a readable repository directory: {}", .0.display())]
    InvalidRepository(PathBuf),

    #[error("No valid text files found in the directory: {}", .0.display())]
    EmptyRepository(PathBuf),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error(
        "Index was built with embedding model '{indexed}' but queries use '{configured}'. Re-index the repository."
    )]
    EmbeddingModelMismatch { indexed: String, configured: String },

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod shell;
