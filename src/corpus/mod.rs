//! Corpus loading: raw example-post file to numbered documents.
//!
//! Documents are separated by a blank line. Undecodable byte sequences are
//! dropped rather than failing the whole run.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{PostsmithError, Result};

/// Separator between two example posts
pub const DOCUMENT_DELIMITER: &str = "\n\n";

/// One example post, numbered by its position in the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    pub ordinal: usize,
    pub text: String,
}

/// Metadata stored alongside each indexed post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Number of characters (Unicode scalar values)
    pub length: u32,
    /// Number of line breaks plus one
    pub line_count: u32,
}

impl EntryMetadata {
    #[inline]
    pub fn for_text(text: &str) -> Self {
        let length = text.chars().count();
        let line_count = text.matches('\n').count() + 1;
        Self {
            length: u32::try_from(length).unwrap_or(u32::MAX),
            line_count: u32::try_from(line_count).unwrap_or(u32::MAX),
        }
    }
}

impl CorpusDocument {
    /// Stable index identifier, `post_<ordinal>`
    #[inline]
    pub fn entry_id(&self) -> String {
        entry_id(self.ordinal)
    }

    #[inline]
    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata::for_text(&self.text)
    }
}

#[inline]
pub fn entry_id(ordinal: usize) -> String {
    format!("post_{ordinal}")
}

/// Inverse of [`entry_id`]
#[inline]
pub fn parse_entry_id(id: &str) -> Option<usize> {
    id.strip_prefix("post_")?.parse().ok()
}

/// A loaded corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    pub documents: Vec<CorpusDocument>,
    /// Bytes discarded because they were not valid UTF-8
    pub invalid_bytes_dropped: usize,
}

/// Read and split a corpus file.
///
/// A missing or unreadable file is fatal. Encoding problems are not.
#[inline]
pub async fn load_corpus(path: &Path) -> Result<Corpus> {
    debug!("Reading corpus from {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PostsmithError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

    let (text, invalid_bytes_dropped) = sanitize_utf8(&bytes);
    if invalid_bytes_dropped > 0 {
        warn!(
            "Dropped {} undecodable bytes from {}",
            invalid_bytes_dropped,
            path.display()
        );
    }

    let documents = split_documents(&text);
    info!(
        "Loaded {} documents from {}",
        documents.len(),
        path.display()
    );

    Ok(Corpus {
        documents,
        invalid_bytes_dropped,
    })
}

/// Decode UTF-8, skipping every invalid sequence.
///
/// Returns the decoded text and the number of bytes skipped. Unlike
/// `String::from_utf8_lossy` nothing is substituted for the bad bytes.
#[inline]
pub fn sanitize_utf8(bytes: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(bytes.len());
    let mut dropped = 0;

    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        dropped += chunk.invalid().len();
    }

    (text, dropped)
}

/// Split corpus text into trimmed, non-empty documents numbered from zero
#[inline]
pub fn split_documents(text: &str) -> Vec<CorpusDocument> {
    let normalized = text.replace("\r\n", "\n");

    normalized
        .split(DOCUMENT_DELIMITER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(ordinal, piece)| CorpusDocument {
            ordinal,
            text: piece.to_string(),
        })
        .collect()
}
