// LanceDB vector database module
// Handles vector storage and similarity search for example posts

#[cfg(test)]
mod tests;

pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::corpus::{CorpusDocument, EntryMetadata, parse_entry_id};

pub use vector_store::{IndexMode, OpenError, SearchResult, VectorStore};

/// One row written to the style collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// `post_<ordinal>`, unique within a collection
    pub id: String,
    pub text: String,
    pub metadata: EntryMetadata,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    #[inline]
    pub fn from_document(document: &CorpusDocument, vector: Vec<f32>) -> Self {
        Self {
            id: document.entry_id(),
            text: document.text.clone(),
            metadata: document.metadata(),
            vector,
        }
    }
}

/// A stored row as read back, without its vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub text: String,
    pub metadata: EntryMetadata,
    /// RFC 3339 timestamp of the indexing run that wrote the row
    pub indexed_at: String,
}

impl StoredEntry {
    /// Corpus position encoded in the id, if it follows the `post_<N>` form
    #[inline]
    pub fn ordinal(&self) -> Option<usize> {
        parse_entry_id(&self.id)
    }
}
