use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn config_file_persistence() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");

    let original_config = Config {
        ollama: OllamaConfig {
            protocol: "https".to_string(),
            host: "test-host".to_string(),
            port: 8080,
            model: "test-model".to_string(),
            batch_size: 32,
            ..OllamaConfig::default()
        },
        base_dir: std::path::PathBuf::new(),
        ..Config::default()
    };

    let toml_content = toml::to_string_pretty(&original_config)
        .expect("config should convert to toml string successfully");
    fs::write(&config_path, toml_content).expect("should write to config_path successfully");

    let content =
        fs::read_to_string(&config_path).expect("should read from config_path successfully");
    let loaded_config: Config = toml::from_str(&content).expect("should parse toml correctly");

    assert_eq!(original_config, loaded_config);
}

#[test]
fn invalid_toml_handling() {
    let invalid_toml = r#"
        [ollama
        host = "localhost"
        port = "invalid_port"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}

#[test]
fn partial_config_with_defaults() {
    let partial_toml = r#"
        [ollama]
        host = "custom-host"

        [anthropic]
        model = "claude-custom"
    "#;

    let config: Config = toml::from_str(partial_toml).expect("partial config should parse");
    assert_eq!(config.ollama.host, "custom-host");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.anthropic.model, "claude-custom");
    assert_eq!(config.anthropic.base_url, "https://api.anthropic.com");
    assert_eq!(config.retrieval, RetrievalConfig::default());
}

#[test]
fn config_dir_is_namespaced() {
    if let Ok(dir) = get_config_dir() {
        assert!(dir.ends_with("repo-chat"));
    }
}
