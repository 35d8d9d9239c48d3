//! Message types for LLM conversations
//!
//! The conversation is an ordered list of [`Message`] values, one variant per
//! speaker kind. Everything downstream (merging, rendering, token counting) matches
//! on the variant, so adding a speaker kind is a compile error until each consumer
//! handles it.

use crate::error::{Error, Result};
use crate::tools::ToolCall;
use serde::{Deserialize, Serialize};

/// Role in a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool response
    Tool,
}

impl MessageRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Requested image fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Let the backend decide
    #[default]
    Auto,
    /// Fixed low-resolution pass
    Low,
    /// Full tiling
    High,
}

impl ImageDetail {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

/// Where the image bytes come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    /// Inline base64 data
    Base64 {
        /// MIME type (e.g. "image/png")
        mime_type: String,
        /// Base64 encoded data
        data: String,
    },
    /// Remote URL
    Url {
        /// Image URL
        url: String,
    },
}

/// Image content part
///
/// Pixel dimensions are carried alongside the data; token accounting needs them
/// and the adapter never decodes image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePart {
    /// Image data or location
    #[serde(flatten)]
    pub source: ImageSource,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Requested detail
    #[serde(default)]
    pub detail: ImageDetail,
}

impl ImagePart {
    /// Inline base64 image
    #[must_use]
    pub fn base64(
        mime_type: impl Into<String>,
        data: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            source: ImageSource::Base64 {
                mime_type: mime_type.into(),
                data: data.into(),
            },
            width,
            height,
            detail: ImageDetail::Auto,
        }
    }

    /// Image referenced by URL
    #[must_use]
    pub fn url(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            source: ImageSource::Url { url: url.into() },
            width,
            height,
            detail: ImageDetail::Auto,
        }
    }

    /// Set the requested detail
    #[must_use]
    pub fn with_detail(mut self, detail: ImageDetail) -> Self {
        self.detail = detail;
        self
    }

    /// URL form sent on the wire (`data:` URI for inline images)
    #[must_use]
    pub fn data_uri(&self) -> String {
        match &self.source {
            ImageSource::Base64 { mime_type, data } => format!("data:{mime_type};base64,{data}"),
            ImageSource::Url { url } => url.clone(),
        }
    }
}

/// One ordered part of a multimodal user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text segment
    Text {
        /// Text
        text: String,
    },
    /// Image segment
    Image(ImagePart),
}

impl ContentPart {
    /// Text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// User message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Plain text
    Text(String),
    /// Ordered text and image parts
    Parts(Vec<ContentPart>),
}

impl UserContent {
    /// Whether any part is an image
    #[must_use]
    pub fn has_images(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Parts(parts) => parts.iter().any(|p| matches!(p, ContentPart::Image(_))),
        }
    }
}

/// System instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMessage {
    /// Instruction text
    pub content: String,
}

/// A user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Display name of the speaker
    #[serde(default)]
    pub source: String,
    /// Text or multimodal parts
    pub content: UserContent,
}

/// An assistant turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Display name of the speaker
    #[serde(default)]
    pub source: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested in this turn; empty means none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Reasoning kept apart from the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

impl AssistantMessage {
    /// Assistant turn that requests tool calls
    ///
    /// # Errors
    /// Returns [`Error::Config`] when `tool_calls` is empty.
    pub fn with_tool_calls(source: impl Into<String>, tool_calls: Vec<ToolCall>) -> Result<Self> {
        if tool_calls.is_empty() {
            return Err(Error::Config(
                "assistant tool call list must not be empty".to_string(),
            ));
        }
        Ok(Self {
            source: source.into(),
            content: None,
            tool_calls,
            thought: None,
        })
    }
}

/// Output of one executed tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this answers
    pub call_id: String,
    /// Tool name
    #[serde(default)]
    pub name: String,
    /// Result text
    pub content: String,
    /// Whether the tool failed
    #[serde(default)]
    pub is_error: bool,
}

/// Results of one batch of tool calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultMessage {
    /// One entry per call
    pub results: Vec<ToolResult>,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System instructions
    System(SystemMessage),
    /// User turn
    User(UserMessage),
    /// Assistant turn
    Assistant(AssistantMessage),
    /// Tool results
    Tool(ToolResultMessage),
}

impl Message {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(SystemMessage {
            content: content.into(),
        })
    }

    /// Create a text user message
    #[must_use]
    pub fn user(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::User(UserMessage {
            source: source.into(),
            content: UserContent::Text(content.into()),
        })
    }

    /// Create a multimodal user message
    #[must_use]
    pub fn user_parts(source: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self::User(UserMessage {
            source: source.into(),
            content: UserContent::Parts(parts),
        })
    }

    /// Create a text assistant message
    #[must_use]
    pub fn assistant(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            source: source.into(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            thought: None,
        })
    }

    /// Create a single tool response message
    #[must_use]
    pub fn tool_response(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool(ToolResultMessage {
            results: vec![ToolResult {
                call_id: call_id.into(),
                name: name.into(),
                content: content.into(),
                is_error: false,
            }],
        })
    }

    /// Role of this message
    #[must_use]
    pub fn role(&self) -> MessageRole {
        match self {
            Self::System(_) => MessageRole::System,
            Self::User(_) => MessageRole::User,
            Self::Assistant(_) => MessageRole::Assistant,
            Self::Tool(_) => MessageRole::Tool,
        }
    }

    /// Whether this message carries image parts
    #[must_use]
    pub fn has_images(&self) -> bool {
        match self {
            Self::User(user) => user.content.has_images(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let system = Message::system("You are a helpful assistant");
        assert_eq!(system.role(), MessageRole::System);

        let user = Message::user("alice", "Hello!");
        assert_eq!(user.role(), MessageRole::User);

        let assistant = Message::assistant("bot", "Hi there!");
        assert_eq!(assistant.role(), MessageRole::Assistant);

        let tool = Message::tool_response("call_123", "lookup", r#"{"result": "ok"}"#);
        assert_eq!(tool.role(), MessageRole::Tool);
        match tool {
            Message::Tool(m) => assert_eq!(m.results[0].call_id, "call_123"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_message_role_as_str() {
        assert_eq!(MessageRole::System.as_str(), "system");
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        assert_eq!(MessageRole::Tool.as_str(), "tool");
    }

    #[test]
    fn test_has_images() {
        let text = Message::user("u", "plain");
        assert!(!text.has_images());

        let mixed = Message::user_parts(
            "u",
            vec![
                ContentPart::text("look"),
                ContentPart::Image(ImagePart::url("https://example.com/a.png", 10, 10)),
            ],
        );
        assert!(mixed.has_images());
    }

    #[test]
    fn test_data_uri() {
        let img = ImagePart::base64("image/png", "aGVsbG8=", 1, 1);
        assert_eq!(img.data_uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_assistant_tool_calls_must_be_non_empty() {
        assert!(AssistantMessage::with_tool_calls("bot", vec![]).is_err());

        let msg = AssistantMessage::with_tool_calls(
            "bot",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "search".to_string(),
                arguments: "{}".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn test_message_deserialize_tagged() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "role": "user",
            "source": "alice",
            "content": [
                {"type": "text", "text": "what is this?"},
                {"type": "image", "url": "https://example.com/cat.png", "width": 800, "height": 600, "detail": "low"}
            ]
        }))
        .unwrap();

        let Message::User(user) = msg else {
            panic!("expected user message");
        };
        let UserContent::Parts(parts) = user.content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 2);
        match &parts[1] {
            ContentPart::Image(img) => {
                assert_eq!(img.width, 800);
                assert_eq!(img.detail, ImageDetail::Low);
            }
            ContentPart::Text { .. } => panic!("expected image"),
        }
    }
}
