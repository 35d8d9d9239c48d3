//! Capability descriptors for DeepSeek models
//!
//! A [`CapabilityDescriptor`] records what a backend model accepts: vision input,
//! function calling, JSON and structured output, and whether it reads more than one
//! system message. The built-in table covers the DeepSeek models; any other model
//! needs an explicit descriptor.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DeepSeek API base URL
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";

/// Default DeepSeek model
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Context window shared by the DeepSeek models
pub const DEEPSEEK_TOKEN_LIMIT: usize = 200_000;

/// Aliases resolved before the capability lookup. Checked against the model name the
/// backend reports at runtime.
const MODEL_POINTERS: &[(&str, &str)] = &[("deepseek-chat", "deepseek-chat")];

/// Known models
pub const MODELS: &[&str] = &["deepseek-chat", "deepseek-reasoner"];

/// A capability the adapter gates on before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Image input
    Vision,
    /// Tool / function calling
    FunctionCalling,
    /// `response_format = json_object`
    JsonOutput,
    /// Schema-constrained output
    StructuredOutput,
}

impl Capability {
    /// Returns the human-readable name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::FunctionCalling => "function calling",
            Self::JsonOutput => "JSON output",
            Self::StructuredOutput => "structured output",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// DeepSeek R1 style reasoning models
    R1,
    /// OpenAI GPT models served through a compatible endpoint
    Gpt,
    /// Anthropic Claude models served through a compatible endpoint
    Claude,
    /// Google Gemini models served through a compatible endpoint
    Gemini,
    /// Anything else
    #[default]
    Unknown,
}

impl ModelFamily {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R1 => "r1",
            Self::Gpt => "gpt",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Unknown => "unknown",
        }
    }

    /// Families that may return reasoning text inline with the answer
    #[must_use]
    pub fn is_reasoning(&self) -> bool {
        matches!(self, Self::R1)
    }

    /// Families that reject a final assistant turn ending in whitespace
    #[must_use]
    pub fn rejects_trailing_whitespace(&self) -> bool {
        matches!(self, Self::Claude)
    }
}

/// Delimiters around an inline reasoning segment, e.g. `<think>` / `</think>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtDelimiters {
    /// Marker that opens the reasoning segment (optional in the text)
    pub open: String,
    /// Marker that closes the reasoning segment
    pub close: String,
}

impl ThoughtDelimiters {
    /// Create a delimiter pair
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Static facts about a backend model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Accepts image input
    #[serde(default)]
    pub vision: bool,
    /// Accepts tool definitions
    #[serde(default)]
    pub function_calling: bool,
    /// Supports `response_format = json_object`
    #[serde(default)]
    pub json_output: bool,
    /// Supports schema-constrained output
    #[serde(default)]
    pub structured_output: bool,
    /// Reads more than one system message
    #[serde(default)]
    pub multiple_system_messages: bool,
    /// Model family
    #[serde(default)]
    pub family: ModelFamily,
    /// Context window in tokens
    pub token_limit: usize,
    /// Inline reasoning delimiters for reasoning families
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_delimiters: Option<ThoughtDelimiters>,
}

impl CapabilityDescriptor {
    /// A descriptor with every capability disabled
    #[must_use]
    pub fn minimal(family: ModelFamily, token_limit: usize) -> Self {
        Self {
            vision: false,
            function_calling: false,
            json_output: false,
            structured_output: false,
            multiple_system_messages: false,
            family,
            token_limit,
            thought_delimiters: None,
        }
    }

    /// Whether the given capability is declared
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Vision => self.vision,
            Capability::FunctionCalling => self.function_calling,
            Capability::JsonOutput => self.json_output,
            Capability::StructuredOutput => self.structured_output,
        }
    }

    /// Fail with [`Error::Unsupported`] unless the capability is declared
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(Error::Unsupported(capability))
        }
    }

    /// Set the inline reasoning delimiters
    #[must_use]
    pub fn with_thought_delimiters(mut self, delimiters: ThoughtDelimiters) -> Self {
        self.thought_delimiters = Some(delimiters);
        self
    }
}

/// Resolve a model alias to the concrete model name
#[must_use]
pub fn resolve_model(model: &str) -> &str {
    MODEL_POINTERS
        .iter()
        .find(|(alias, _)| *alias == model)
        .map_or(model, |(_, target)| target)
}

/// Built-in capabilities for a model
///
/// # Errors
/// Returns [`Error::UnknownModel`] when the model is not in the table.
pub fn lookup(model: &str) -> Result<CapabilityDescriptor> {
    match resolve_model(model) {
        "deepseek-chat" => Ok(CapabilityDescriptor {
            vision: false,
            function_calling: true,
            json_output: true,
            structured_output: true,
            multiple_system_messages: false,
            family: ModelFamily::R1,
            token_limit: DEEPSEEK_TOKEN_LIMIT,
            thought_delimiters: None,
        }),
        "deepseek-reasoner" => Ok(CapabilityDescriptor {
            vision: false,
            function_calling: false,
            json_output: false,
            structured_output: false,
            multiple_system_messages: false,
            family: ModelFamily::R1,
            token_limit: DEEPSEEK_TOKEN_LIMIT,
            thought_delimiters: None,
        }),
        other => Err(Error::UnknownModel(other.to_string())),
    }
}
