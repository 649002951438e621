#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// Integration tests for indexing realistic corpora with the offline embedder
use postsmith::PostsmithError;
use postsmith::config::{Config, EmbeddingProvider};
use postsmith::database::lancedb::{IndexMode, VectorStore};
use postsmith::indexer::Indexer;
use tempfile::TempDir;

const SAMPLE_CORPUS: &str = "\
🚀 Consistency beats intensity.
Show up every day, even when it is boring.

I failed my first startup.
Here is what it taught me about listening to customers.

Nobody talks about the quiet weeks.
The ones where nothing ships.
They matter too.

Hiring tip: look for curiosity over credentials.
";

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::with_base_dir(temp_dir.path().join("data"));
    config.embedding.provider = EmbeddingProvider::Hashing;
    config.embedding.hashing_dimension = 128;
    (config, temp_dir)
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("should write corpus");
    path
}

async fn stored_entries(config: &Config) -> Vec<postsmith::database::lancedb::StoredEntry> {
    VectorStore::open_existing(config)
        .await
        .expect("should open index")
        .list_entries()
        .await
        .expect("should list entries")
}

#[tokio::test]
async fn indexes_realistic_corpus_with_metadata() {
    let (config, temp_dir) = create_test_config();
    let corpus = write_file(&temp_dir, "posts.txt", SAMPLE_CORPUS.as_bytes());

    let stats = Indexer::from_config(config.clone())
        .expect("should build indexer")
        .index_corpus(&corpus, IndexMode::Rebuild)
        .await
        .expect("should index corpus");

    assert_eq!(stats.documents_read, 4);
    assert_eq!(stats.entries_written, 4);

    let entries = stored_entries(&config).await;
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].id, "post_0");
    assert!(entries[0].text.starts_with("🚀 Consistency"));
    assert_eq!(entries[0].metadata.line_count, 2);
    assert_eq!(
        entries[0].metadata.length as usize,
        entries[0].text.chars().count()
    );
    assert_eq!(entries[2].metadata.line_count, 3);
    assert_eq!(entries[3].text, "Hiring tip: look for curiosity over credentials.");
}

#[tokio::test]
async fn reindexing_a_changed_corpus_replaces_entries() {
    let (config, temp_dir) = create_test_config();
    let indexer = Indexer::from_config(config.clone()).expect("should build indexer");

    let first = write_file(&temp_dir, "first.txt", SAMPLE_CORPUS.as_bytes());
    indexer
        .index_corpus(&first, IndexMode::Rebuild)
        .await
        .expect("should index first corpus");

    let second = write_file(&temp_dir, "second.txt", b"Only one post now.");
    indexer
        .index_corpus(&second, IndexMode::Rebuild)
        .await
        .expect("should index second corpus");

    let entries = stored_entries(&config).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Only one post now.");
}

#[tokio::test]
async fn append_mode_updates_in_place() {
    let (config, temp_dir) = create_test_config();
    let indexer = Indexer::from_config(config.clone()).expect("should build indexer");

    let first = write_file(&temp_dir, "first.txt", b"Alpha post.\n\nBeta post.");
    indexer
        .index_corpus(&first, IndexMode::Rebuild)
        .await
        .expect("should index first corpus");

    let second = write_file(
        &temp_dir,
        "second.txt",
        b"Alpha post, edited.\n\nBeta post.\n\nGamma post.",
    );
    indexer
        .index_corpus(&second, IndexMode::Upsert)
        .await
        .expect("should append corpus");

    let entries = stored_entries(&config).await;
    let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Alpha post, edited.", "Beta post.", "Gamma post."]);
}

#[tokio::test]
async fn invalid_utf8_is_dropped_not_fatal() {
    let (config, temp_dir) = create_test_config();
    let corpus = write_file(
        &temp_dir,
        "broken.txt",
        b"Good post.\n\nBad \xff\xfe bytes here.",
    );

    let stats = Indexer::from_config(config.clone())
        .expect("should build indexer")
        .index_corpus(&corpus, IndexMode::Rebuild)
        .await
        .expect("should index corpus");

    assert_eq!(stats.entries_written, 2);
    assert_eq!(stats.invalid_bytes_dropped, 2);

    let entries = stored_entries(&config).await;
    assert_eq!(entries[1].text, "Bad  bytes here.");
}

#[tokio::test]
async fn missing_corpus_reports_source_unavailable() {
    let (config, temp_dir) = create_test_config();

    let result = Indexer::from_config(config)
        .expect("should build indexer")
        .index_corpus(&temp_dir.path().join("absent.txt"), IndexMode::Rebuild)
        .await;

    match result {
        Err(PostsmithError::SourceUnavailable { path, .. }) => {
            assert!(path.ends_with("absent.txt"));
        }
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
}
