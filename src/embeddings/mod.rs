// Embeddings module
// The embedding function shared by the indexer and the retriever

pub mod hashing;
pub mod ollama;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{Config, EmbeddingProvider};

pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// A fixed text-to-vector function.
///
/// Every vector an embedder returns has length [`Embedder::dimension`].
/// Two embedders with equal [`Embedder::fingerprint`] must produce the same
/// vectors, which is what lets the retriever trust an index built earlier
/// by a different process.
pub trait Embedder: Send + Sync {
    /// Embed a single text. Empty or whitespace-only input is an error.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize;

    /// Stable identifier of provider, model and dimension
    fn fingerprint(&self) -> String;
}

/// Build the embedder selected by `embedding.provider`
#[inline]
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.provider {
        EmbeddingProvider::Ollama => {
            let client =
                OllamaClient::new(config).context("Failed to initialize Ollama client")?;
            Ok(Arc::new(client))
        }
        EmbeddingProvider::Hashing => {
            let embedder = HashingEmbedder::new(config.embedding.hashing_dimension as usize)
                .context("Failed to initialize hashing embedder")?;
            Ok(Arc::new(embedder))
        }
    }
}
