use super::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config {
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Hashing,
                hashing_dimension: 256,
            },
            ollama: OllamaConfig {
                protocol: "https".to_string(),
                host: "test-host".to_string(),
                port: 8080,
                model: "test-model".to_string(),
                batch_size: 32,
                embedding_dimension: 384,
            },
            index: IndexConfig {
                directory: "styles".to_string(),
                collection: "team_posts".to_string(),
                default_results: 5,
            },
            corpus: CorpusConfig {
                path: PathBuf::from("posts/archive.txt"),
            },
            generation: GenerationConfig::default(),
            base_dir: PathBuf::new(),
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
    fn unknown_provider_is_rejected() {
        let result: Result<Config, toml::de::Error> = toml::from_str(
            r#"
                [embedding]
                provider = "sentence-transformers"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [embedding]
            provider = "ollama"

            [ollama]
            protocol = "http"
            host = "localhost"
            port = 11434
            model = "all-minilm:latest"
            batch_size = 64
            embedding_dimension = 384

            [index]
            directory = "chroma"
            collection = "linkedin_styles"
            default_results = 3

            [corpus]
            path = "data/linkedin_posts.txt"

            [generation]
            default_context = "Show up every day."
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert_eq!(config.ollama.model, "all-minilm:latest");
        assert_eq!(config.ollama.embedding_dimension, 384);
        assert_eq!(config.index.directory, "chroma");
        assert_eq!(config.generation.default_context, "Show up every day.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation_edge_cases() {
        let config = Config {
            ollama: OllamaConfig {
                host: String::new(),
                port: 80,
                ..OllamaConfig::default()
            },
            ..Config::default()
        };

        // Empty host should be invalid
        assert!(config.validate().is_err());
    }

    #[test]
    fn ollama_url_generation_with_different_hosts() {
        let configs = vec![
            ("http", "localhost", 11434, "http://localhost:11434/"),
            ("http", "127.0.0.1", 8080, "http://127.0.0.1:8080/"),
            (
                "https",
                "secure.example.com",
                443,
                "https://secure.example.com/",
            ),
        ];

        for (protocol, host, port, expected_url) in configs {
            let config = Config {
                ollama: OllamaConfig {
                    protocol: protocol.to_string(),
                    host: host.to_string(),
                    port,
                    ..OllamaConfig::default()
                },
                ..Config::default()
            };

            let url = config.ollama_url().expect("ollama_url is ok");
            assert_eq!(url.as_str(), expected_url);
        }
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = PathBuf::from("/tmp/postsmith-explicit");
        let resolved = resolve_data_dir(Some(dir.clone())).expect("should resolve");
        assert_eq!(resolved, dir);
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidProtocol("ftp".to_string()),
            ConfigError::InvalidPort(0),
            ConfigError::InvalidBatchSize(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::InvalidCollection("bad name".to_string()),
            ConfigError::InvalidResultCount(0),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(message.len() > 10);
        }
    }
}
