use anyhow::{Context, Result};
use console::{Term, style};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Config, EmbeddingProvider};
use crate::database::lancedb::{IndexMode, VectorStore};
use crate::embeddings::ollama::OllamaClient;
use crate::generation::{ContextSource, PostGenerator, PostLength, PostRequest, Tone};
use crate::indexer::{Indexer, IndexingStats};
use crate::retriever::{IndexState, Retriever};

fn load_config(data_dir: &Path) -> Result<Config> {
    Config::load(data_dir).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            data_dir.display()
        )
    })
}

/// Build or extend the style index from a corpus file
#[inline]
pub async fn index_corpus(
    data_dir: &Path,
    corpus: Option<PathBuf>,
    append: bool,
) -> Result<IndexingStats> {
    let config = load_config(data_dir)?;
    let corpus = corpus.unwrap_or_else(|| config.corpus.path.clone());
    let mode = if append {
        IndexMode::Upsert
    } else {
        IndexMode::Rebuild
    };

    let indexer = Indexer::from_config(config.clone())?.with_progress(Term::stderr().is_term());
    let stats = indexer.index_corpus(&corpus, mode).await?;

    println!(
        "{} Indexed {} of {} posts into '{}'",
        style("✓").green(),
        style(stats.entries_written).cyan(),
        stats.documents_read,
        config.index.collection
    );
    if stats.documents_skipped > 0 {
        println!(
            "{} Skipped {} posts that could not be embedded: {}",
            style("⚠").yellow(),
            stats.documents_skipped,
            stats.skipped_ids.join(", ")
        );
    }
    if stats.invalid_bytes_dropped > 0 {
        println!(
            "{} Dropped {} bytes that were not valid UTF-8",
            style("⚠").yellow(),
            stats.invalid_bytes_dropped
        );
    }

    Ok(stats)
}

/// Print the example posts closest to `query`
#[inline]
pub async fn search(data_dir: &Path, query: &str, k: Option<usize>) -> Result<()> {
    let config = load_config(data_dir)?;
    let k = k.unwrap_or(config.index.default_results);

    let retriever = Retriever::shared(&config).await;
    if let IndexState::Unavailable(reason) = retriever.state() {
        println!("{} Style index unavailable: {}", style("⚠").yellow(), reason);
        println!("Run 'postsmith index' to build it.");
        return Ok(());
    }

    let documents = retriever.retrieve(query, k).await;
    if documents.is_empty() {
        println!("No matching posts found.");
        return Ok(());
    }

    for (rank, document) in documents.iter().enumerate() {
        println!(
            "{} {} (distance {:.4}, {} chars, {} lines)",
            style(format!("#{}", rank + 1)).bold(),
            style(&document.id).cyan(),
            document.distance,
            document.metadata.length,
            document.metadata.line_count
        );
        println!("{}", document.text);
        println!();
    }

    Ok(())
}

/// Generate a post, or print the LLM style prompt when `prompt_only` is set
#[inline]
pub async fn generate(
    data_dir: &Path,
    topic: String,
    tone: Tone,
    length: PostLength,
    prompt_only: bool,
) -> Result<()> {
    let config = load_config(data_dir)?;
    let retriever = Retriever::shared(&config).await;
    let generator = PostGenerator::new(retriever, &config);

    if prompt_only {
        let prompt = generator.style_prompt(&topic).await?;
        println!("{prompt}");
        return Ok(());
    }

    let post = generator
        .generate(&PostRequest {
            topic,
            tone,
            length,
        })
        .await?;

    match &post.context_source {
        ContextSource::Retrieved { id } => info!("Context taken from {}", id),
        ContextSource::Fallback => eprintln!(
            "{} No example post retrieved, using the default context",
            style("⚠").yellow()
        ),
    }

    println!("{}", post.text);
    Ok(())
}

/// Report configuration, embedder and index health
#[inline]
pub async fn show_status(data_dir: &Path) -> Result<()> {
    let config = load_config(data_dir).unwrap_or_else(|_| Config::with_base_dir(data_dir));

    println!("{}", style("📊 Postsmith Status Report").bold().cyan());
    println!("{}", "=".repeat(50));
    println!();

    println!("{}", style("🤖 Embedder:").bold());
    match config.embedding.provider {
        EmbeddingProvider::Ollama => match OllamaClient::new(&config) {
            Ok(client) => match client.health_check() {
                Ok(()) => println!(
                    "   ✅ Ollama: Connected ({}:{}), model {}",
                    config.ollama.host, config.ollama.port, config.ollama.model
                ),
                Err(e) => println!("   ⚠️  Ollama: Unhealthy - {e:#}"),
            },
            Err(e) => println!("   ❌ Ollama: Failed to initialize - {e:#}"),
        },
        EmbeddingProvider::Hashing => println!(
            "   ✅ Hashing: {} dimensions",
            config.embedding.hashing_dimension
        ),
    }

    println!("{}", style("🔍 Style Index:").bold());
    println!("   Path: {}", config.vector_database_path().display());
    println!("   Collection: {}", config.index.collection);
    match VectorStore::open_existing(&config).await {
        Ok(store) => {
            let count = store
                .count_entries()
                .await
                .map_or_else(|e| format!("unknown ({e})"), |n| n.to_string());
            println!("   Entries: {count}");
            println!("   Dimension: {}", store.dimension());
            println!(
                "   Built by: {}",
                store.fingerprint().unwrap_or("unknown embedder")
            );
        }
        Err(e) => println!("   ❌ {e}"),
    }

    let retriever = Retriever::from_config(&config).await;
    match retriever.state() {
        IndexState::Ready { .. } => println!("   ✅ Retriever: Ready"),
        IndexState::Unavailable(reason) => println!("   ⚠️  Retriever: Unavailable - {reason}"),
    }

    Ok(())
}
