use super::*;
use crate::config::EmbeddingProvider;
use crate::database::lancedb::VectorStore;
use crate::embeddings::HashingEmbedder;
use anyhow::bail;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const CORPUS: &str = "Consistency wins.\n\nPersistence pays off.\n\nKeep learning.\nEvery day.";

/// Refuses any text containing "fail"; counts batch calls
struct PickyEmbedder {
    inner: HashingEmbedder,
    batch_calls: AtomicUsize,
}

impl PickyEmbedder {
    fn new() -> Self {
        Self {
            inner: HashingEmbedder::new(16).expect("valid dimension"),
            batch_calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for PickyEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.contains("fail") {
            bail!("refusing to embed {text:?}");
        }
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn fingerprint(&self) -> String {
        "test:picky:16".to_string()
    }
}

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::with_base_dir(temp_dir.path());
    config.embedding.provider = EmbeddingProvider::Hashing;
    config.embedding.hashing_dimension = 32;
    (config, temp_dir)
}

fn write_corpus(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("posts.txt");
    std::fs::write(&path, contents).expect("should write corpus");
    path
}

#[test]
fn indexer_creation() {
    let (config, _temp_dir) = create_test_config();
    let indexer = Indexer::from_config(config).expect("should build indexer");
    assert_eq!(indexer.embedder.dimension(), 32);
    assert_eq!(indexer.batch_size, 16);

    let indexer = indexer.with_batch_size(0);
    assert_eq!(indexer.batch_size, 1);
}

#[tokio::test]
async fn indexes_every_document() {
    let (config, temp_dir) = create_test_config();
    let corpus = write_corpus(&temp_dir, CORPUS);

    let indexer = Indexer::from_config(config.clone()).expect("should build indexer");
    let stats = indexer
        .index_corpus(&corpus, IndexMode::Rebuild)
        .await
        .expect("should index corpus");

    assert_eq!(stats.documents_read, 3);
    assert_eq!(stats.entries_written, 3);
    assert_eq!(stats.documents_skipped, 0);

    let store = VectorStore::open_existing(&config)
        .await
        .expect("should open index");
    let entries = store.list_entries().await.expect("should list entries");
    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["post_0", "post_1", "post_2"]);
    assert_eq!(entries[2].metadata.line_count, 2);
    assert_eq!(entries[0].metadata.length, 17);
    assert_eq!(store.fingerprint(), Some("hashing:fnv1a:32"));
}

#[tokio::test]
async fn reindexing_does_not_duplicate() {
    let (config, temp_dir) = create_test_config();
    let corpus = write_corpus(&temp_dir, CORPUS);
    let indexer = Indexer::from_config(config.clone()).expect("should build indexer");

    for mode in [IndexMode::Rebuild, IndexMode::Rebuild, IndexMode::Upsert] {
        indexer
            .index_corpus(&corpus, mode)
            .await
            .expect("should index corpus");
    }

    let store = VectorStore::open_existing(&config)
        .await
        .expect("should open index");
    assert_eq!(store.count_entries().await.expect("should count"), 3);
}

#[tokio::test]
async fn skips_documents_that_fail_to_embed() {
    let (config, temp_dir) = create_test_config();
    let corpus = write_corpus(&temp_dir, "First post.\n\nThis one will fail.\n\nThird post.");

    let embedder = Arc::new(PickyEmbedder::new());
    let indexer = Indexer::new(config.clone(), embedder.clone()).with_batch_size(8);
    let stats = indexer
        .index_corpus(&corpus, IndexMode::Rebuild)
        .await
        .expect("should index remaining documents");

    assert_eq!(stats.documents_read, 3);
    assert_eq!(stats.entries_written, 2);
    assert_eq!(stats.skipped_ids, vec!["post_1".to_string()]);
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);

    let store = VectorStore::open_existing(&config)
        .await
        .expect("should open index");
    let ids: Vec<String> = store
        .list_entries()
        .await
        .expect("should list entries")
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["post_0".to_string(), "post_2".to_string()]);
}

#[tokio::test]
async fn total_embedding_failure_leaves_index_untouched() {
    let (config, temp_dir) = create_test_config();
    let good = write_corpus(&temp_dir, CORPUS);
    Indexer::from_config(config.clone())
        .expect("should build indexer")
        .index_corpus(&good, IndexMode::Rebuild)
        .await
        .expect("should index corpus");

    let bad = temp_dir.path().join("bad.txt");
    std::fs::write(&bad, "fail one\n\nfail two").expect("should write corpus");
    let result = Indexer::new(config.clone(), Arc::new(PickyEmbedder::new()))
        .index_corpus(&bad, IndexMode::Rebuild)
        .await;
    assert!(matches!(result, Err(PostsmithError::Embedding(_))));

    let store = VectorStore::open_existing(&config)
        .await
        .expect("should open index");
    assert_eq!(store.count_entries().await.expect("should count"), 3);
}

#[tokio::test]
async fn missing_corpus_is_fatal() {
    let (config, temp_dir) = create_test_config();
    let indexer = Indexer::from_config(config.clone()).expect("should build indexer");

    let result = indexer
        .index_corpus(&temp_dir.path().join("nope.txt"), IndexMode::Rebuild)
        .await;

    assert!(matches!(result, Err(PostsmithError::SourceUnavailable { .. })));
    assert!(!config.vector_database_path().exists());
}

#[tokio::test]
async fn empty_corpus_builds_empty_collection() {
    let (config, temp_dir) = create_test_config();
    let corpus = write_corpus(&temp_dir, "\n\n  \n\n");

    let stats = Indexer::from_config(config.clone())
        .expect("should build indexer")
        .index_corpus(&corpus, IndexMode::Rebuild)
        .await
        .expect("should index empty corpus");

    assert_eq!(stats, IndexingStats::default());
    let store = VectorStore::open_existing(&config)
        .await
        .expect("should open index");
    assert_eq!(store.count_entries().await.expect("should count"), 0);
}
