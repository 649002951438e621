#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance
// Run with: cargo test --test integration_ollama -- --ignored

use postsmith::config::{Config, EmbeddingProvider};
use postsmith::database::lancedb::IndexMode;
use postsmith::embeddings::Embedder;
use postsmith::embeddings::ollama::OllamaClient;
use postsmith::indexer::Indexer;
use postsmith::retriever::Retriever;
use std::env;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const TEST_MODEL: &str = "nomic-embed-text:latest";

fn create_integration_test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::with_base_dir(temp_dir.path());
    config.embedding.provider = EmbeddingProvider::Ollama;
    if let Ok(host) = env::var("OLLAMA_HOST") {
        config.ollama.host = host;
    }
    if let Some(port) = env::var("OLLAMA_PORT").ok().and_then(|p| p.parse().ok()) {
        config.ollama.port = port;
    }
    config.ollama.model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| TEST_MODEL.to_string());
    config.ollama.batch_size = 2;
    config
}

fn create_integration_test_client(config: &Config) -> OllamaClient {
    OllamaClient::new(config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(3)
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create temp dir");
    let client = create_integration_test_client(&create_integration_test_config(&temp_dir));

    let result = client.health_check();
    assert!(result.is_ok(), "Health check should succeed: {:?}", result);
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_embeddings_have_configured_dimension() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create temp dir");
    let client = create_integration_test_client(&create_integration_test_config(&temp_dir));

    let texts = vec![
        "Consistency wins.".to_string(),
        "Persistence pays off.".to_string(),
        "Keep learning every day.".to_string(),
    ];
    let embeddings = client
        .embed_batch(&texts)
        .expect("batch embedding should succeed");

    assert_eq!(embeddings.len(), texts.len());
    for embedding in &embeddings {
        assert_eq!(embedding.len(), client.dimension());
    }
    info!("Generated {} embeddings", embeddings.len());
}

#[tokio::test]
#[ignore = "requires a local Ollama instance"]
async fn real_ollama_index_and_retrieve() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = create_integration_test_config(&temp_dir);

    let corpus = temp_dir.path().join("posts.txt");
    std::fs::write(
        &corpus,
        "Consistency beats intensity when building habits.\n\n\
         I laughed so hard at my own typo in a client email.\n\n\
         Leadership means listening before speaking.",
    )
    .expect("should write corpus");

    let stats = Indexer::from_config(config.clone())
        .expect("should build indexer")
        .index_corpus(&corpus, IndexMode::Rebuild)
        .await
        .expect("should index corpus");
    assert_eq!(stats.entries_written, 3);

    let retriever = Retriever::from_config(&config).await;
    assert!(retriever.is_ready());

    let results = retriever.retrieve("building consistent habits", 2).await;
    debug!("Results: {:?}", results);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "post_0");
}
