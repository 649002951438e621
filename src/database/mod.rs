// Database module
// Persistent vector storage for the style index (LanceDB)

pub mod lancedb;

pub use self::lancedb::{IndexEntry, IndexMode, OpenError, SearchResult, StoredEntry, VectorStore};
