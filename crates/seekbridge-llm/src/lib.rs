//! Seekbridge LLM - DeepSeek chat-completion adapter
//!
//! This crate turns a provider-neutral conversation into DeepSeek's
//! OpenAI-compatible wire format and back:
//! - Capability: per-model feature descriptor and the built-in model table
//! - Transform: system-message merging, name prefixing, wire rendering
//! - Tools: tool-name sanitization and schema conversion
//! - Token: deterministic prompt token estimates, including images and tool schemas
//! - Response: finish-reason normalization, tool-call and reasoning extraction
//! - Client: request orchestration, capability gates, cancellation, usage totals
//! - Settings: layered configuration (defaults, files, `SEEKBRIDGE_*` env)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod client;
pub mod diagnostics;
pub mod error;
pub mod message;
pub mod response;
pub mod settings;
pub mod token;
pub mod tools;
pub mod transform;
pub mod transport;
pub mod usage;
pub mod util;
pub mod wire;

pub use capability::{
    lookup, resolve_model, Capability, CapabilityDescriptor, ModelFamily, ThoughtDelimiters,
    DEEPSEEK_API_BASE, DEEPSEEK_TOKEN_LIMIT, DEFAULT_MODEL, MODELS,
};
pub use client::{
    validate_extra_args, ClientConfig, Completion, CreateArgs, DeepSeekClient, OutputFormat,
    ALLOWED_EXTRA_ARGS, CREATE_ARGS_SCHEMA_VERSION, DISALLOWED_EXTRA_ARGS,
};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use message::{
    AssistantMessage, ContentPart, ImageDetail, ImagePart, ImageSource, Message, MessageRole,
    SystemMessage, ToolResult, ToolResultMessage, UserContent, UserMessage,
};
pub use response::{parse_choice, FinishReason, NormalizedResult, ParsedChoice, ResultContent};
pub use settings::Settings;
pub use token::{count_tokens, image_tokens, TokenCount, TokenCounter};
pub use tools::{convert_tools, sanitize_tool_name, ToolCall, ToolChoice, ToolDescriptor};
pub use transform::{merge_system_messages, transform, TransformOptions};
pub use transport::{ChatTransport, HttpTransport};
pub use usage::{RequestUsage, UsageTotals};
