// Configuration management module
// TOML settings for the embedding service, the chat model and retrieval

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    AnthropicConfig, Config, ConfigError, OllamaConfig, RetrievalConfig, VECTOR_STORE_DIR,
};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_config_dir()
}
