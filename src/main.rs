//! Seekbridge - DeepSeek chat adapter
//!
//! CLI entry point: token counting and one-shot requests.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let json_logs = cli.log_format == cli::LogFormat::Json;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seekbridge=info,seekbridge_llm=info".into()),
        )
        .with(json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    debug!("seekbridge v{}", env!("CARGO_PKG_VERSION"));

    cli::run(cli).await
}
