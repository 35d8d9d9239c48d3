//! `seekbridge count`

use super::read_json;
use anyhow::{Context, Result};
use seekbridge_llm::{ClientConfig, Message, TokenCounter, ToolDescriptor};
use std::path::Path;

/// Print the token estimate, the remaining context, and any diagnostics
pub fn run(config: ClientConfig, messages: &Path, tools: Option<&Path>) -> Result<()> {
    let capabilities = config.validate().context("Invalid client configuration")?;
    let messages: Vec<Message> = read_json(messages)?;
    let tools: Vec<ToolDescriptor> = match tools {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let count = TokenCounter::for_model(&config.model)
        .count(&messages, &tools, config.add_name_prefixes)
        .context("Failed to count tokens")?;

    println!("model:      {}", config.model);
    println!("tokens:     {}", count.tokens);
    println!(
        "remaining:  {}",
        capabilities.token_limit.saturating_sub(count.tokens)
    );
    for diagnostic in &count.diagnostics {
        println!("warning:    {diagnostic}");
    }
    Ok(())
}
