use clap::{Parser, Subcommand};
use postsmith::commands::{generate, index_corpus, search, show_status};
use postsmith::config::{resolve_data_dir, run_interactive_config, show_config};
use postsmith::generation::{PostLength, Tone};
use postsmith::{PostsmithError, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "postsmith")]
#[command(about = "Generate LinkedIn-style posts from a retrieved library of example posts")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the style index
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedder and index settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index a corpus of example posts separated by blank lines
    Index {
        /// Corpus file, defaults to `corpus.path` from the configuration
        corpus: Option<PathBuf>,
        /// Keep existing entries and replace those with the same id
        #[arg(long)]
        append: bool,
    },
    /// Show the example posts closest to a query
    Search {
        query: String,
        /// Number of results, defaults to `index.default_results`
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Generate a post about a topic
    Generate {
        topic: String,
        #[arg(long, value_enum, default_value_t = Tone::Professional)]
        tone: Tone,
        #[arg(long, value_enum, default_value_t = PostLength::Short)]
        length: PostLength,
        /// Print the LLM style prompt instead of a templated post
        #[arg(long)]
        prompt: bool,
    },
    /// Show embedder and index health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir =
        resolve_data_dir(cli.data_dir).map_err(|e| PostsmithError::Config(e.to_string()))?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&data_dir)?;
            } else {
                run_interactive_config(&data_dir)?;
            }
        }
        Commands::Index { corpus, append } => {
            index_corpus(&data_dir, corpus, append).await?;
        }
        Commands::Search { query, k } => {
            search(&data_dir, &query, k).await?;
        }
        Commands::Generate {
            topic,
            tone,
            length,
            prompt,
        } => {
            generate(&data_dir, topic, tone, length, prompt).await?;
        }
        Commands::Status => {
            show_status(&data_dir).await?;
        }
    }

    Ok(())
}
