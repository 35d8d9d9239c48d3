//! `seekbridge ask`

use anyhow::{Context, Result};
use seekbridge_llm::{ClientConfig, DeepSeekClient, Message, OutputFormat, ResultContent};
use serde_json::Map;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Send one prompt; Ctrl-C cancels the request
pub async fn run(
    config: ClientConfig,
    prompt: String,
    system: Option<String>,
    json: bool,
) -> Result<()> {
    let client = DeepSeekClient::new(config).context("Failed to create DeepSeek client")?;

    let mut messages = Vec::new();
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user("user", prompt));

    let output = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling request");
            on_signal.cancel();
        }
    });

    let completion = client
        .create(&messages, &[], &output, &Map::new(), Some(&cancel))
        .await
        .context("Request failed")?;

    let result = &completion.result;
    if let Some(thought) = &result.thought {
        println!("--- thought ---\n{thought}\n--- answer ---");
    }
    match &result.content {
        ResultContent::Text(text) => println!("{text}"),
        ResultContent::ToolCalls(calls) => {
            println!("{}", serde_json::to_string_pretty(calls)?);
        }
    }

    let usage = client.actual_usage();
    eprintln!(
        "[{} | prompt {} | completion {}]",
        result.finish_reason.as_str(),
        usage.prompt_tokens,
        usage.completion_tokens
    );
    for diagnostic in &completion.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    Ok(())
}
