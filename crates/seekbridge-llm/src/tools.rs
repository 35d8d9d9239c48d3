//! Tool types for LLM function calling
//!
//! Tool descriptors are converted into the backend's `tools` array. Names are
//! sanitized to `[A-Za-z0-9_-]`, truncated to 64 characters, and validated again
//! after conversion.

use crate::error::{Error, Result};
use crate::wire::{ChatFunction, ChatTool};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::LazyLock;

/// Maximum tool name length accepted by the backend
pub const MAX_TOOL_NAME_LEN: usize = 64;

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"));

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

/// Abstract tool description supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, before sanitization
    pub name: String,
    /// Tool description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// Strict schema adherence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ToolDescriptor {
    /// Create a new tool descriptor
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters: Some(parameters),
            strict: None,
        }
    }

    /// Set strict mode
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

/// Tool choice strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Don't use tools
    None,
    /// Force a tool call
    Required,
    /// Use a specific tool by name
    Tool(String),
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::None => serializer.serialize_str("none"),
            Self::Required => serializer.serialize_str("required"),
            Self::Tool(name) => serde_json::json!({
                "type": "function",
                "function": {"name": name}
            })
            .serialize(serializer),
        }
    }
}

/// Replace characters outside `[A-Za-z0-9_-]` with `_` and cut to 64 characters
#[must_use]
pub fn sanitize_tool_name(name: &str) -> String {
    let mut sanitized = INVALID_NAME_CHARS.replace_all(name, "_").into_owned();
    // only ASCII remains, so byte truncation is char truncation
    sanitized.truncate(MAX_TOOL_NAME_LEN);
    sanitized
}

/// Check a tool name against the backend's character and length rule
///
/// # Errors
/// Returns [`Error::InvalidToolName`] for empty, over-long, or non-conforming names.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.len() > MAX_TOOL_NAME_LEN || !VALID_NAME.is_match(name) {
        return Err(Error::InvalidToolName(name.to_string()));
    }
    Ok(())
}

/// Convert descriptors into the backend tool-schema array
///
/// # Errors
/// Returns [`Error::InvalidToolName`] if any converted name fails validation.
pub fn convert_tools(tools: &[ToolDescriptor]) -> Result<Vec<ChatTool>> {
    let converted: Vec<ChatTool> = tools.iter().map(convert_tool).collect();
    for tool in &converted {
        validate_tool_name(&tool.function.name)?;
    }
    Ok(converted)
}

fn convert_tool(tool: &ToolDescriptor) -> ChatTool {
    ChatTool {
        r#type: "function".to_string(),
        function: ChatFunction {
            name: sanitize_tool_name(&tool.name),
            description: tool.description.clone().unwrap_or_default(),
            parameters: tool
                .parameters
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            strict: tool.strict.unwrap_or(false),
        },
    }
}
