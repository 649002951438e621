
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, EmbeddingProvider, IndexConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config(data_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Postsmith Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(data_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("The same embedding function is used to build and to query the style index.");
    eprintln!();

    let previous_provider = config.embedding.provider;
    config.embedding.provider = select_provider(config.embedding.provider)?;

    match config.embedding.provider {
        EmbeddingProvider::Ollama => {
            configure_ollama(&mut config.ollama)?;

            eprintln!();
            eprintln!("{}", style("Testing configuration...").yellow());

            if test_ollama_connection(&config.ollama) {
                eprintln!("{}", style("✓ Ollama connection successful!").green());
            } else {
                eprintln!(
                    "{}",
                    style("⚠ Warning: Could not connect to Ollama").yellow()
                );
                eprintln!("You can continue, but make sure Ollama is running before indexing.");
            }
        }
        EmbeddingProvider::Hashing => {
            config.embedding.hashing_dimension = Input::new()
                .with_prompt("Hashing embedding dimension")
                .default(config.embedding.hashing_dimension)
                .validate_with(|input: &u32| -> Result<(), &str> {
                    if (8..=4096).contains(input) {
                        Ok(())
                    } else {
                        Err("Dimension must be between 8 and 4096")
                    }
                })
                .interact_text()?;
        }
    }

    if previous_provider != config.embedding.provider {
        eprintln!(
            "{}",
            style("⚠ Embedding provider changed: re-run `postsmith index` before searching.")
                .yellow()
        );
    }

    eprintln!();
    eprintln!("{}", style("Index Configuration").bold().yellow());
    configure_index(&mut config.index)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.embedding.provider).cyan());
    match config.embedding.provider {
        EmbeddingProvider::Ollama => {
            eprintln!("  Host: {}", style(&config.ollama.host).cyan());
            eprintln!("  Port: {}", style(config.ollama.port).cyan());
            eprintln!("  Model: {}", style(&config.ollama.model).cyan());
            eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
            eprintln!(
                "  Dimension: {}",
                style(config.ollama.embedding_dimension).cyan()
            );
            match config.ollama_url() {
                Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
                Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
            }
        }
        EmbeddingProvider::Hashing => {
            eprintln!(
                "  Dimension: {}",
                style(config.embedding.hashing_dimension).cyan()
            );
        }
    }

    eprintln!();
    eprintln!("{}", style("Index Settings:").bold().yellow());
    eprintln!(
        "  Location: {}",
        style(config.vector_database_path().display()).cyan()
    );
    eprintln!("  Collection: {}", style(&config.index.collection).cyan());
    eprintln!(
        "  Results per query: {}",
        style(config.index.default_results).cyan()
    );
    eprintln!(
        "  Default corpus: {}",
        style(config.corpus.path.display()).cyan()
    );

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}

fn load_existing_config(data_dir: &Path) -> Result<Config> {
    Config::load(data_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config::with_base_dir(data_dir))
        },
        |config| {
            eprintln!("{}", style("Loaded configuration.").green());
            Ok(config)
        },
    )
}

fn select_provider(current: EmbeddingProvider) -> Result<EmbeddingProvider> {
    let providers = [EmbeddingProvider::Ollama, EmbeddingProvider::Hashing];
    let labels = ["ollama (local model server)", "hashing (offline, lexical)"];
    let default_index = providers.iter().position(|&p| p == current).unwrap_or(0);

    let index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(&labels)
        .interact()?;

    Ok(providers[index])
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension reported by the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(dimension)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_index(index: &mut IndexConfig) -> Result<()> {
    index.collection = Input::new()
        .with_prompt("Collection name")
        .default(index.collection.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = Config {
                index: IndexConfig {
                    collection: input.clone(),
                    ..IndexConfig::default()
                },
                ..Config::default()
            };
            candidate.validate()
        })
        .interact_text()?;

    index.default_results = Input::new()
        .with_prompt("Examples retrieved per request")
        .default(index.default_results)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Result count must be between 1 and 100")
            }
        })
        .interact_text()?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
