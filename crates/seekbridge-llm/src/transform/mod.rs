//! Message transformation
//!
//! Turns the neutral [`Message`] sequence into backend [`ChatMessage`] records:
//!
//! 1. merge runs of system messages when the model reads only one,
//! 2. right-trim the final assistant turn for families that reject trailing whitespace,
//! 3. render each message by variant.

use crate::capability::CapabilityDescriptor;
use crate::error::{Error, Result};
use crate::message::{
    AssistantMessage, ContentPart, Message, SystemMessage, ToolResultMessage, UserContent,
    UserMessage,
};
use crate::tools::sanitize_tool_name;
use crate::wire::{
    ChatContent, ChatContentPart, ChatFunctionCall, ChatImageUrl, ChatMessage, ChatToolCall,
};

/// Inputs that shape rendering
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions<'a> {
    /// Active model capabilities
    pub capabilities: &'a CapabilityDescriptor,
    /// Model identifier sent to the backend
    pub model: &'a str,
    /// Tag user and assistant turns with their source name
    pub prepend_name: bool,
}

/// Collapse contiguous system messages into one
///
/// Returns the input unchanged when the model accepts multiple system messages.
///
/// # Errors
/// Returns [`Error::NonContiguousSystemMessages`] when a system message follows a
/// non-system message that itself follows an earlier system message.
pub fn merge_system_messages(
    messages: &[Message],
    capabilities: &CapabilityDescriptor,
) -> Result<Vec<Message>> {
    if capabilities.multiple_system_messages {
        return Ok(messages.to_vec());
    }

    let mut merged = String::new();
    let mut rest = Vec::with_capacity(messages.len());
    let mut first_system: Option<usize> = None;
    let mut last_system = 0usize;

    for (idx, message) in messages.iter().enumerate() {
        match message {
            Message::System(SystemMessage { content }) => {
                match first_system {
                    None => first_system = Some(idx),
                    Some(_) if last_system + 1 != idx => {
                        return Err(Error::NonContiguousSystemMessages);
                    }
                    Some(_) => {}
                }
                merged.push_str(content);
                merged.push('\n');
                last_system = idx;
            }
            other => rest.push(other.clone()),
        }
    }

    let merged = merged.trim_end();
    if let Some(position) = first_system {
        if !merged.is_empty() {
            rest.insert(position, Message::system(merged));
        }
    }
    Ok(rest)
}

/// Whether the final assistant turn must not end in whitespace
#[must_use]
pub fn requires_trimmed_final_assistant(capabilities: &CapabilityDescriptor, model: &str) -> bool {
    capabilities.family.rejects_trailing_whitespace() || model.starts_with("claude-")
}

/// Right-trim the text of the last message if it is an assistant turn
pub fn trim_final_assistant(messages: &mut [Message]) {
    if let Some(Message::Assistant(AssistantMessage {
        content: Some(content),
        ..
    })) = messages.last_mut()
    {
        let trimmed_len = content.trim_end().len();
        content.truncate(trimmed_len);
    }
}

/// Render one message; tool result batches expand to one record per result
#[must_use]
pub fn to_wire(message: &Message, prepend_name: bool) -> Vec<ChatMessage> {
    match message {
        Message::System(system) => vec![ChatMessage::text("system", system.content.clone())],
        Message::User(user) => vec![user_to_wire(user, prepend_name)],
        Message::Assistant(assistant) => vec![assistant_to_wire(assistant, prepend_name)],
        Message::Tool(tool) => tool_to_wire(tool),
    }
}

/// Merge, trim and render a full conversation
///
/// # Errors
/// Propagates [`merge_system_messages`] errors.
pub fn transform(messages: &[Message], options: TransformOptions<'_>) -> Result<Vec<ChatMessage>> {
    let mut messages = merge_system_messages(messages, options.capabilities)?;
    if requires_trimmed_final_assistant(options.capabilities, options.model) {
        trim_final_assistant(&mut messages);
    }
    Ok(messages
        .iter()
        .flat_map(|m| to_wire(m, options.prepend_name))
        .collect())
}

fn speaker_name(source: &str, prepend_name: bool) -> Option<String> {
    (prepend_name && !source.is_empty()).then(|| sanitize_tool_name(source))
}

fn user_to_wire(user: &UserMessage, prepend_name: bool) -> ChatMessage {
    let prefix = prepend_name.then(|| format!("{} said:\n", user.source));

    let content = match &user.content {
        UserContent::Text(text) => ChatContent::Text(with_prefix(prefix.as_deref(), text)),
        UserContent::Parts(parts) if !user.content.has_images() => {
            let text = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            ChatContent::Text(with_prefix(prefix.as_deref(), &text))
        }
        UserContent::Parts(parts) => {
            let mut rendered: Vec<ChatContentPart> = parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => ChatContentPart::Text { text: text.clone() },
                    ContentPart::Image(image) => ChatContentPart::ImageUrl {
                        image_url: ChatImageUrl {
                            url: image.data_uri(),
                            detail: Some(image.detail.as_str().to_string()),
                        },
                    },
                })
                .collect();
            if let Some(prefix) = prefix {
                match rendered.first_mut() {
                    Some(ChatContentPart::Text { text }) => text.insert_str(0, &prefix),
                    _ => rendered.insert(0, ChatContentPart::Text { text: prefix }),
                }
            }
            ChatContent::Parts(rendered)
        }
    };

    ChatMessage {
        role: "user".to_string(),
        content: Some(content),
        name: speaker_name(&user.source, prepend_name),
        tool_calls: None,
        tool_call_id: None,
    }
}

fn with_prefix(prefix: Option<&str>, text: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{text}"),
        None => text.to_string(),
    }
}

fn assistant_to_wire(assistant: &AssistantMessage, prepend_name: bool) -> ChatMessage {
    let tool_calls = (!assistant.tool_calls.is_empty()).then(|| {
        assistant
            .tool_calls
            .iter()
            .map(|call| ChatToolCall {
                id: call.id.clone(),
                r#type: "function".to_string(),
                function: ChatFunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect()
    });

    // a bare assistant turn still needs a content field
    let content = match (&assistant.content, &tool_calls) {
        (Some(text), _) => Some(ChatContent::Text(text.clone())),
        (None, Some(_)) => None,
        (None, None) => Some(ChatContent::Text(String::new())),
    };

    ChatMessage {
        role: "assistant".to_string(),
        content,
        name: speaker_name(&assistant.source, prepend_name),
        tool_calls,
        tool_call_id: None,
    }
}

fn tool_to_wire(tool: &ToolResultMessage) -> Vec<ChatMessage> {
    tool.results
        .iter()
        .map(|result| ChatMessage {
            role: "tool".to_string(),
            content: Some(ChatContent::Text(result.content.clone())),
            name: None,
            tool_calls: None,
            tool_call_id: Some(result.call_id.clone()),
        })
        .collect()
}
