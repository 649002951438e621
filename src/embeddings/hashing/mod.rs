
use anyhow::{Result, bail};
use fnv::FnvHasher;
use std::hash::Hasher;
use tracing::trace;

use super::Embedder;

const SCHEME: &str = "fnv1a";

/// Offline embedder based on signed feature hashing.
///
/// Each lower-cased alphanumeric token is hashed with FNV-1a; the hash picks
/// a bucket and a sign, and the accumulated vector is L2-normalised. Texts
/// that share words end up close under cosine distance. No model download or
/// network access is needed, which makes it the embedder used by tests and
/// by installs without an Ollama server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            bail!("Hashing embedder dimension must be greater than zero");
        }
        Ok(Self { dimension })
    }

    /// Lower-cased alphanumeric tokens of `text`
    #[inline]
    pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = FnvHasher::default();
        hasher.write(token.as_bytes());
        let hash = hasher.finish();

        let index = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Embedder for HashingEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimension];
        let mut token_count = 0_usize;

        for token in Self::tokenize(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
            token_count += 1;
        }

        if token_count == 0 {
            bail!("Text contains no embeddable tokens");
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            bail!("Token features cancelled out to a zero vector");
        }
        for value in &mut vector {
            *value /= norm;
        }

        trace!("Hashed {} tokens into {} buckets", token_count, self.dimension);
        Ok(vector)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn fingerprint(&self) -> String {
        format!("hashing:{}:{}", SCHEME, self.dimension)
    }
}
