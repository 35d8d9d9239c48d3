//! OpenAI-compatible chat-completion wire types
//!
//! These mirror the JSON the DeepSeek endpoint accepts and returns. Field names are a
//! fixed external contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chat completion request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Rendered messages
    pub messages: Vec<ChatMessage>,
    /// Always false; streaming is not supported
    pub stream: bool,
    /// Tool schemas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    /// Sampling and format arguments, already validated against the create-args schema
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

/// A rendered message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Backend role
    pub role: String,
    /// Text or content parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ChatContent>,
    /// Speaker name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls requested by an assistant turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    /// Call being answered by a tool message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Message with plain text content and nothing else
    #[must_use]
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(ChatContent::Text(content.into())),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Text content, if the content is plain text
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            Some(ChatContent::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    /// Plain text
    Text(String),
    /// Typed parts
    Parts(Vec<ChatContentPart>),
}

/// Typed content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    /// Text
    Text {
        /// Text
        text: String,
    },
    /// Image reference
    ImageUrl {
        /// Image location and detail
        image_url: ChatImageUrl,
    },
}

/// Image location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatImageUrl {
    /// URL or data URI
    pub url: String,
    /// auto / low / high
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outgoing tool call inside an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCall {
    /// Call ID
    pub id: String,
    /// Always "function"
    pub r#type: String,
    /// Function invocation
    pub function: ChatFunctionCall,
}

/// Function invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFunctionCall {
    /// Function name
    pub name: String,
    /// Raw JSON arguments
    pub arguments: String,
}

/// Tool schema entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTool {
    /// Always "function"
    pub r#type: String,
    /// Function definition
    pub function: ChatFunction,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFunction {
    /// Sanitized name
    pub name: String,
    /// Description (may be empty)
    pub description: String,
    /// JSON schema of the parameters
    pub parameters: Value,
    /// Strict schema adherence
    pub strict: bool,
}

/// Chat completion response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Model that served the request
    #[serde(default)]
    pub model: String,
    /// Completion choices
    pub choices: Vec<ChatChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// One completion choice
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Returned message
    pub message: ChatResponseMessage,
    /// Backend finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Returned message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponseMessage {
    /// Role (normally "assistant")
    #[serde(default)]
    pub role: Option<String>,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// DeepSeek reasoning output
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Requested tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<ChatResponseToolCall>>,
    /// Deprecated single function call
    #[serde(default)]
    pub function_call: Option<Value>,
}

/// Returned tool call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponseToolCall {
    /// Call ID
    pub id: String,
    /// Call type
    #[serde(default)]
    pub r#type: Option<String>,
    /// Function invocation
    pub function: ChatResponseFunction,
}

/// Returned function invocation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponseFunction {
    /// Function name as the model wrote it
    pub name: String,
    /// Arguments; normally a JSON string, some backends send an object
    #[serde(default)]
    pub arguments: Value,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ChatUsage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u64,
}
