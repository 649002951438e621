// Configuration management module
// TOML settings shared by the indexer, the retriever and the CLI

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, CorpusConfig, DATA_DIR_ENV, EmbeddingConfig, EmbeddingProvider,
    GenerationConfig, IndexConfig, OllamaConfig,
};

/// Resolve the data directory, preferring an explicit override
#[inline]
pub fn resolve_data_dir(
    explicit: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    match explicit {
        Some(dir) => Ok(dir),
        None => Config::default_base_dir(),
    }
}
