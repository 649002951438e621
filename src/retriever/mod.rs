// Retriever module
// Online, read-only nearest-neighbour lookup over the style collection


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::corpus::EntryMetadata;
use crate::database::lancedb::{OpenError, SearchResult, VectorStore};
use crate::embeddings::{Embedder, build_embedder};

static SHARED: OnceCell<Retriever> = OnceCell::const_new();

/// Why the retriever cannot serve queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnavailableReason {
    #[error("no index has been built yet")]
    IndexMissing,
    #[error("collection '{0}' does not exist")]
    CollectionMissing(String),
    #[error("index could not be opened: {0}")]
    OpenFailed(String),
    #[error("index was built by embedder '{found}' but '{expected}' is configured")]
    EmbedderMismatch { expected: String, found: String },
    #[error("embedder could not be initialised: {0}")]
    EmbedderUnavailable(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Style index unavailable: {0}")]
    Unavailable(UnavailableReason),
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// A ranked example post
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub id: String,
    pub text: String,
    pub metadata: EntryMetadata,
    /// Cosine distance to the query, lower is closer
    pub distance: f32,
}

impl From<SearchResult> for RetrievedDocument {
    #[inline]
    fn from(result: SearchResult) -> Self {
        Self {
            id: result.entry.id,
            text: result.entry.text,
            metadata: result.entry.metadata,
            distance: result.distance,
        }
    }
}

pub enum IndexState {
    Ready {
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
    },
    Unavailable(UnavailableReason),
}

impl std::fmt::Debug for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready { store, embedder } => f
                .debug_struct("Ready")
                .field("store", store)
                .field("embedder", &embedder.fingerprint())
                .finish(),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Read-only view of the style index.
///
/// Opening never fails; an index that cannot be used puts the retriever in
/// the [`IndexState::Unavailable`] state and every query returns nothing.
#[derive(Debug)]
pub struct Retriever {
    state: IndexState,
    consecutive_failures: AtomicUsize,
}

impl Retriever {
    /// Open the configured collection with an explicit embedder
    #[inline]
    pub async fn open(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        let state = match VectorStore::open_existing(config).await {
            Ok(store) => Self::check_embedder(store, embedder),
            Err(e) => {
                let reason = match e {
                    OpenError::Missing(_) => UnavailableReason::IndexMissing,
                    OpenError::CollectionMissing(name) => {
                        UnavailableReason::CollectionMissing(name)
                    }
                    OpenError::Connect(msg) | OpenError::Schema(msg) => {
                        UnavailableReason::OpenFailed(msg)
                    }
                };
                IndexState::Unavailable(reason)
            }
        };

        match &state {
            IndexState::Ready { store, .. } => info!(
                "Style index '{}' ready ({} dimensions)",
                store.collection(),
                store.dimension()
            ),
            IndexState::Unavailable(reason) => warn!("Style index unavailable: {}", reason),
        }

        Self {
            state,
            consecutive_failures: AtomicUsize::new(0),
        }
    }

    /// Open the configured collection with the configured embedder
    #[inline]
    pub async fn from_config(config: &Config) -> Self {
        match build_embedder(config) {
            Ok(embedder) => Self::open(config, embedder).await,
            Err(e) => {
                let reason = UnavailableReason::EmbedderUnavailable(format!("{e:#}"));
                warn!("Style index unavailable: {}", reason);
                Self {
                    state: IndexState::Unavailable(reason),
                    consecutive_failures: AtomicUsize::new(0),
                }
            }
        }
    }

    /// Process-wide retriever, opened on first use and kept for the
    /// lifetime of the process. Later calls ignore `config`.
    #[inline]
    pub async fn shared(config: &Config) -> &'static Self {
        SHARED.get_or_init(|| Self::from_config(config)).await
    }

    fn check_embedder(store: VectorStore, embedder: Arc<dyn Embedder>) -> IndexState {
        let expected = embedder.fingerprint();

        if store.dimension() != embedder.dimension() {
            return IndexState::Unavailable(UnavailableReason::EmbedderMismatch {
                expected,
                found: store
                    .fingerprint()
                    .map_or_else(|| format!("{} dimensions", store.dimension()), str::to_string),
            });
        }

        // Collections written before fingerprints were recorded only get the dimension check
        match store.fingerprint().map(str::to_string) {
            Some(found) if found != expected => {
                IndexState::Unavailable(UnavailableReason::EmbedderMismatch { expected, found })
            }
            _ => IndexState::Ready { store, embedder },
        }
    }

    #[inline]
    pub fn state(&self) -> &IndexState {
        &self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, IndexState::Ready { .. })
    }

    /// Queries that failed since the last successful one
    #[inline]
    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Up to `k` documents closest to `query`, closest first.
    ///
    /// Never fails: an unavailable index or a failed query yields an empty
    /// list and a log line.
    #[inline]
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievedDocument> {
        match self.try_retrieve(query, k).await {
            Ok(documents) => documents,
            Err(RetrievalError::Unavailable(reason)) => {
                debug!("Skipping retrieval, index unavailable: {}", reason);
                Vec::new()
            }
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// Like [`Retriever::retrieve`] but reports why nothing was returned
    #[inline]
    pub async fn try_retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let (store, embedder) = match &self.state {
            IndexState::Ready { store, embedder } => (store, embedder),
            IndexState::Unavailable(reason) => {
                return Err(RetrievalError::Unavailable(reason.clone()));
            }
        };

        if k == 0 {
            return Ok(Vec::new());
        }

        match Self::query(store, embedder, query, k).await {
            Ok(documents) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                Ok(documents)
            }
            Err(e) => {
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                Err(RetrievalError::QueryFailed(e))
            }
        }
    }

    async fn query(
        store: &VectorStore,
        embedder: &Arc<dyn Embedder>,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, String> {
        let embedder = Arc::clone(embedder);
        let text = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| format!("Embedding task failed: {e}"))?
            .map_err(|e| format!("Failed to embed query: {e:#}"))?;

        let results = store
            .search(&vector, k)
            .await
            .map_err(|e| e.to_string())?;

        debug!("Retrieved {} documents for query", results.len());
        Ok(results.into_iter().map(RetrievedDocument::from).collect())
    }
}
