//! CLI module for Seekbridge
//!
//! - `count`: estimate prompt tokens for a conversation file
//! - `ask`: send one prompt and print the normalized result

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use seekbridge_llm::{ClientConfig, Settings};
use std::path::{Path, PathBuf};

pub mod ask;
pub mod count;

/// Seekbridge CLI
#[derive(Parser, Debug)]
#[command(name = "seekbridge")]
#[command(about = "DeepSeek chat adapter")]
#[command(version)]
pub struct Cli {
    /// Model id, overriding settings
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate prompt tokens for a conversation
    Count {
        /// JSON array of messages
        #[arg(long)]
        messages: PathBuf,
        /// JSON array of tool descriptors
        #[arg(long)]
        tools: Option<PathBuf>,
    },
    /// Send one prompt
    Ask {
        /// User prompt
        prompt: String,
        /// System message
        #[arg(long)]
        system: Option<String>,
        /// Request a JSON object answer
        #[arg(long)]
        json: bool,
    },
}

/// Load settings and apply command-line overrides
fn client_config(model: Option<String>) -> Result<ClientConfig> {
    let mut config = Settings::load()
        .context("Failed to load settings")?
        .into_client_config();
    if let Some(model) = model {
        config.model = model;
    }
    Ok(config)
}

/// Read and parse a JSON file
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Count { messages, tools }) => {
            count::run(client_config(cli.model)?, &messages, tools.as_deref())
        }
        Some(Commands::Ask {
            prompt,
            system,
            json,
        }) => ask::run(client_config(cli.model)?, prompt, system, json).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
