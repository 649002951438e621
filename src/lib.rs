use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PostsmithError>;

#[derive(Error, Debug)]
pub enum PostsmithError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Corpus file {} could not be read: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Style index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod indexer;
pub mod retriever;
