use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "all-minilm");
    assert_eq!(config.ollama.embedding_dimension, 384);
    assert_eq!(config.anthropic.base_url, "https://api.anthropic.com");
    assert_eq!(config.retrieval.top_k, 4);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.anthropic.base_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.anthropic.max_tokens = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.retrieval.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config.ollama, parsed_config.ollama);
    assert_eq!(config.anthropic, parsed_config.anthropic);
    assert_eq!(config.retrieval, parsed_config.retrieval);
    assert_eq!(parsed_config.data_dir, PathBuf::from("."));
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());
    assert!(config.set_embedding_dimension(768).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_embedding_dimension(8).is_err());

    let mut anthropic = AnthropicConfig::default();
    assert!(anthropic.set_model("claude-test".to_string()).is_ok());
    assert!(anthropic.set_model("  ".to_string()).is_err());
    assert!(anthropic.set_max_tokens(1024).is_ok());
    assert!(anthropic.set_max_tokens(100_000).is_err());
    assert_eq!(anthropic.model, "claude-test");
    assert_eq!(anthropic.max_tokens, 1024);
}

#[test]
fn load_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing config falls back to defaults");
    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.anthropic, AnthropicConfig::default());
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.ollama.host = "embeddings.internal".to_string();
    config.anthropic.max_tokens = 2048;
    config.retrieval.top_k = 6;

    config.save().expect("should save config");
    assert!(temp_dir.path().join("config.toml").exists());

    let reloaded = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(reloaded.ollama.host, "embeddings.internal");
    assert_eq!(reloaded.anthropic.max_tokens, 2048);
    assert_eq!(reloaded.retrieval.top_k, 6);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 500\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn vector_database_path_is_under_data_dir() {
    let config = Config {
        data_dir: PathBuf::from("/tmp/work"),
        ..Config::default()
    };
    assert_eq!(
        config.vector_database_path(),
        PathBuf::from("/tmp/work").join(VECTOR_STORE_DIR)
    );
    assert_eq!(
        Config::default().vector_database_path(),
        PathBuf::from("./repo_chat_db")
    );
}
