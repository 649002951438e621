// Indexer module
// Offline job that turns a corpus file into the persistent style collection

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::corpus::{CorpusDocument, load_corpus};
use crate::database::lancedb::{IndexEntry, IndexMode, VectorStore};
use crate::embeddings::{Embedder, build_embedder};
use crate::{PostsmithError, Result};

/// Corpus indexer writing example posts into the vector store
pub struct Indexer {
    config: Config,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    show_progress: bool,
}

/// Statistics about an indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingStats {
    pub documents_read: usize,
    pub entries_written: usize,
    pub documents_skipped: usize,
    pub invalid_bytes_dropped: usize,
    /// Ids of documents that could not be embedded
    pub skipped_ids: Vec<String>,
}

impl Indexer {
    #[inline]
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let batch_size = config.ollama.batch_size.max(1) as usize;
        Self {
            config,
            embedder,
            batch_size,
            show_progress: false,
        }
    }

    /// Create an indexer using the embedder selected in `config`
    #[inline]
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = build_embedder(&config)?;
        Ok(Self::new(config, embedder))
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Index every document in the corpus file at `path`.
    ///
    /// Documents that cannot be embedded are skipped and reported in the
    /// returned stats; their ordinals are not reused. If the corpus has
    /// documents but none can be embedded the collection is left untouched
    /// and an error is returned.
    #[inline]
    pub async fn index_corpus(&self, path: &Path, mode: IndexMode) -> Result<IndexingStats> {
        info!(
            "Indexing {} into collection '{}' ({:?})",
            path.display(),
            self.config.index.collection,
            mode
        );

        let corpus = load_corpus(path).await?;

        let mut stats = IndexingStats {
            documents_read: corpus.documents.len(),
            invalid_bytes_dropped: corpus.invalid_bytes_dropped,
            ..IndexingStats::default()
        };

        let entries = self.embed_documents(&corpus.documents, &mut stats).await;

        if stats.documents_read > 0 && entries.is_empty() {
            return Err(PostsmithError::Embedding(format!(
                "None of the {} documents could be embedded; index left unchanged",
                stats.documents_read
            )));
        }

        let store = VectorStore::create(
            &self.config,
            self.embedder.dimension(),
            &self.embedder.fingerprint(),
            mode,
        )
        .await?;

        match mode {
            IndexMode::Rebuild => store.add_entries(&entries).await?,
            IndexMode::Upsert => store.upsert_entries(&entries).await?,
        }
        stats.entries_written = entries.len();

        info!(
            "Indexed {} of {} documents ({} skipped) into '{}'",
            stats.entries_written,
            stats.documents_read,
            stats.documents_skipped,
            store.collection()
        );

        Ok(stats)
    }

    async fn embed_documents(
        &self,
        documents: &[CorpusDocument],
        stats: &mut IndexingStats,
    ) -> Vec<IndexEntry> {
        let bar = self.progress_bar(documents.len());
        let mut entries = Vec::with_capacity(documents.len());

        for batch in documents.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();

            match self.embed_texts(texts).await {
                Ok(vectors) if vectors.len() == batch.len() => {
                    entries.extend(
                        batch
                            .iter()
                            .zip(vectors)
                            .map(|(document, vector)| IndexEntry::from_document(document, vector)),
                    );
                }
                outcome => {
                    if let Err(e) = outcome {
                        debug!("Batch embedding failed, retrying one by one: {:#}", e);
                    }
                    for document in batch {
                        match self.embed_one(&document.text).await {
                            Ok(vector) => entries.push(IndexEntry::from_document(document, vector)),
                            Err(e) => {
                                warn!("Skipping {}: embedding failed: {:#}", document.entry_id(), e);
                                stats.documents_skipped += 1;
                                stats.skipped_ids.push(document.entry_id());
                            }
                        }
                    }
                }
            }

            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        entries
    }

    async fn embed_texts(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_batch(&texts)).await?
    }

    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&text)).await?
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding posts {wide_bar}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len as u64).with_style(style)
    }
}
