//! Response normalization
//!
//! One completion choice becomes a [`NormalizedResult`]. Tool calls take priority over
//! the backend's finish reason; text that comes with tool calls is kept as the
//! thought. Plain text answers may carry reasoning in DeepSeek's `reasoning_content`
//! field or, for reasoning families with configured delimiters, inline.

use crate::capability::{CapabilityDescriptor, ThoughtDelimiters};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::tools::{sanitize_tool_name, ToolCall};
use crate::usage::RequestUsage;
use crate::wire::{ChatChoice, ChatResponseToolCall, ChatUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence
    Stop,
    /// The model requested tool calls
    ToolCalls,
    /// Token limit reached
    Length,
    /// Output filtered
    ContentFilter,
    /// Anything else, including a missing reason
    Other,
}

impl FinishReason {
    /// Map a backend finish reason onto the normalized set
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("stop" | "end_turn" | "stop_sequence") => Self::Stop,
            Some("tool_calls" | "function_call" | "function_calls" | "tool_use") => Self::ToolCalls,
            Some("length" | "max_tokens") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            _ => Self::Other,
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool_calls",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::Other => "other",
        }
    }
}

/// Answer text or a batch of tool calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultContent {
    /// Text answer
    Text(String),
    /// Tool invocations
    ToolCalls(Vec<ToolCall>),
}

impl ResultContent {
    /// Text, if this is a text answer
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::ToolCalls(_) => None,
        }
    }

    /// Tool calls, if any
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Text(_) => &[],
            Self::ToolCalls(calls) => calls,
        }
    }
}

/// Normalized completion result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Answer or tool calls
    pub content: ResultContent,
    /// Reasoning kept apart from the content
    pub thought: Option<String>,
    /// Token usage of this call
    pub usage: RequestUsage,
    /// Whether the result came from a cache
    pub cached: bool,
}

/// A parsed choice and the warnings raised while parsing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChoice {
    /// Normalized result
    pub result: NormalizedResult,
    /// Soft failures
    pub diagnostics: Diagnostics,
}

/// Classify and normalize one completion choice
///
/// # Errors
/// Returns [`Error::LegacyFunctionCall`] when the backend used the deprecated
/// `function_call` field.
pub fn parse_choice(
    choice: &ChatChoice,
    usage: Option<ChatUsage>,
    capabilities: &CapabilityDescriptor,
) -> Result<ParsedChoice> {
    let mut diagnostics = Diagnostics::new();
    let message = &choice.message;

    if message.function_call.is_some() {
        return Err(Error::LegacyFunctionCall);
    }

    let (finish_reason, content, thought) = match message.tool_calls.as_deref() {
        Some(calls) if !calls.is_empty() => {
            if choice.finish_reason.as_deref() != Some("tool_calls") {
                diagnostics.push(Diagnostic::FinishReasonMismatch {
                    reported: choice.finish_reason.clone(),
                });
            }
            let thought = message.content.clone().filter(|text| !text.is_empty());
            let calls = calls
                .iter()
                .map(|call| normalize_tool_call(call, &mut diagnostics))
                .collect();
            (FinishReason::ToolCalls, ResultContent::ToolCalls(calls), thought)
        }
        _ => {
            let mut text = message.content.clone().unwrap_or_default();
            let mut thought = message.reasoning_content.clone();

            if thought.is_none() && capabilities.family.is_reasoning() {
                if let Some(delimiters) = &capabilities.thought_delimiters {
                    match split_thought(&text, delimiters) {
                        Some((reasoning, answer)) => {
                            thought = Some(reasoning);
                            text = answer;
                        }
                        None => diagnostics.push(Diagnostic::ThoughtDelimiterMissing {
                            delimiter: delimiters.close.clone(),
                        }),
                    }
                }
            }

            (
                FinishReason::normalize(choice.finish_reason.as_deref()),
                ResultContent::Text(text),
                thought,
            )
        }
    };

    Ok(ParsedChoice {
        result: NormalizedResult {
            finish_reason,
            content,
            thought,
            usage: RequestUsage::from(usage),
            cached: false,
        },
        diagnostics,
    })
}

fn normalize_tool_call(call: &ChatResponseToolCall, diagnostics: &mut Diagnostics) -> ToolCall {
    let arguments = match &call.function.arguments {
        Value::String(raw) => raw.clone(),
        other => {
            diagnostics.push(Diagnostic::NonStringToolArguments {
                call_id: call.id.clone(),
            });
            other.to_string()
        }
    };
    ToolCall {
        id: call.id.clone(),
        name: sanitize_tool_name(&call.function.name),
        arguments,
    }
}

/// Split `text` into a reasoning segment and the answer after the closing delimiter
///
/// The opening delimiter is optional in the text. Returns `None` when the closing
/// delimiter does not occur.
#[must_use]
pub fn split_thought(text: &str, delimiters: &ThoughtDelimiters) -> Option<(String, String)> {
    if delimiters.close.is_empty() {
        return None;
    }
    let end = text.find(&delimiters.close)?;
    let reasoning = text[..end].trim_start();
    let reasoning = reasoning
        .strip_prefix(delimiters.open.as_str())
        .unwrap_or(reasoning)
        .trim();
    let answer = text[end + delimiters.close.len()..].trim();
    Some((reasoning.to_string(), answer.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{lookup, ModelFamily};
    use crate::wire::ChatResponseMessage;
    use serde_json::json;

    fn choice(message: Value, finish_reason: Option<&str>) -> ChatChoice {
        ChatChoice {
            index: 0,
            message: serde_json::from_value::<ChatResponseMessage>(message).unwrap(),
            finish_reason: finish_reason.map(String::from),
        }
    }

    fn usage(prompt: u64, completion: u64) -> Option<ChatUsage> {
        Some(ChatUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        })
    }

    fn gpt_caps() -> CapabilityDescriptor {
        CapabilityDescriptor::minimal(ModelFamily::Gpt, 8192)
    }

    #[test]
    fn test_plain_text() {
        let parsed = parse_choice(
            &choice(json!({"content": "hello"}), Some("stop")),
            usage(10, 2),
            &gpt_caps(),
        )
        .unwrap();

        assert_eq!(parsed.result.content, ResultContent::Text("hello".to_string()));
        assert_eq!(parsed.result.thought, None);
        assert_eq!(parsed.result.finish_reason, FinishReason::Stop);
        assert_eq!(parsed.result.usage, RequestUsage::new(10, 2));
        assert!(!parsed.result.cached);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_tool_calls_with_text_become_thought() {
        let parsed = parse_choice(
            &choice(
                json!({
                    "content": "I will search first.",
                    "tool_calls": [
                        {"id": "call_1", "type": "function", "function": {"name": "web search", "arguments": "{\"q\":\"rust\"}"}},
                        {"id": "call_2", "type": "function", "function": {"name": "save_file", "arguments": "{}"}}
                    ]
                }),
                Some("stop"),
            ),
            usage(20, 8),
            &gpt_caps(),
        )
        .unwrap();

        let result = parsed.result;
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(result.thought.as_deref(), Some("I will search first."));
        let calls = result.content.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].arguments, "{\"q\":\"rust\"}");
        assert!(parsed.diagnostics.any(|d| matches!(
            d,
            Diagnostic::FinishReasonMismatch { reported } if reported.as_deref() == Some("stop")
        )));
    }

    #[test]
    fn test_tool_calls_without_mismatch() {
        let parsed = parse_choice(
            &choice(
                json!({
                    "content": "",
                    "tool_calls": [{"id": "call_1", "function": {"name": "a", "arguments": "{}"}}]
                }),
                Some("tool_calls"),
            ),
            None,
            &gpt_caps(),
        )
        .unwrap();
        assert_eq!(parsed.result.thought, None);
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.result.usage, RequestUsage::default());
    }

    #[test]
    fn test_tool_calls_with_alias_reason_still_warn() {
        for reported in ["function_call", "tool_use", "TOOL_CALLS"] {
            let parsed = parse_choice(
                &choice(
                    json!({"tool_calls": [{"id": "call_1", "function": {"name": "a", "arguments": "{}"}}]}),
                    Some(reported),
                ),
                None,
                &gpt_caps(),
            )
            .unwrap();
            assert_eq!(parsed.result.finish_reason, FinishReason::ToolCalls);
            assert!(parsed.diagnostics.any(|d| matches!(
                d,
                Diagnostic::FinishReasonMismatch { reported: Some(r) } if r == reported
            )));
        }
    }

    #[test]
    fn test_structured_arguments_are_stringified() {
        let parsed = parse_choice(
            &choice(
                json!({"tool_calls": [{"id": "call_1", "function": {"name": "a", "arguments": {"x": 1}}}]}),
                Some("tool_calls"),
            ),
            None,
            &gpt_caps(),
        )
        .unwrap();
        assert_eq!(parsed.result.content.tool_calls()[0].arguments, r#"{"x":1}"#);
        assert!(parsed.diagnostics.any(|d| matches!(d, Diagnostic::NonStringToolArguments { .. })));
    }

    #[test]
    fn test_empty_tool_call_list_is_text() {
        let parsed = parse_choice(
            &choice(json!({"content": "done", "tool_calls": []}), Some("length")),
            None,
            &gpt_caps(),
        )
        .unwrap();
        assert_eq!(parsed.result.content.as_text(), Some("done"));
        assert_eq!(parsed.result.finish_reason, FinishReason::Length);
    }

    #[test]
    fn test_missing_content_is_empty_text() {
        let parsed = parse_choice(&choice(json!({}), None), None, &gpt_caps()).unwrap();
        assert_eq!(parsed.result.content.as_text(), Some(""));
        assert_eq!(parsed.result.finish_reason, FinishReason::Other);
    }

    #[test]
    fn test_legacy_function_call_is_rejected() {
        let err = parse_choice(
            &choice(
                json!({"content": null, "function_call": {"name": "a", "arguments": "{}"}}),
                Some("function_call"),
            ),
            None,
            &gpt_caps(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::LegacyFunctionCall));
    }

    #[test]
    fn test_reasoning_content_becomes_thought() {
        let caps = lookup("deepseek-reasoner").unwrap();
        let parsed = parse_choice(
            &choice(
                json!({"content": "42", "reasoning_content": "six times seven"}),
                Some("stop"),
            ),
            None,
            &caps,
        )
        .unwrap();
        assert_eq!(parsed.result.thought.as_deref(), Some("six times seven"));
        assert_eq!(parsed.result.content.as_text(), Some("42"));
    }

    #[test]
    fn test_inline_reasoning_split_with_configured_delimiters() {
        let caps = lookup("deepseek-reasoner")
            .unwrap()
            .with_thought_delimiters(ThoughtDelimiters::new("<think>", "</think>"));
        let parsed = parse_choice(
            &choice(
                json!({"content": "<think>\nweigh options\n</think>\n\nThe answer."}),
                Some("stop"),
            ),
            None,
            &caps,
        )
        .unwrap();
        assert_eq!(parsed.result.thought.as_deref(), Some("weigh options"));
        assert_eq!(parsed.result.content.as_text(), Some("The answer."));
    }

    #[test]
    fn test_inline_reasoning_missing_delimiter_degrades() {
        let caps = lookup("deepseek-reasoner")
            .unwrap()
            .with_thought_delimiters(ThoughtDelimiters::new("<think>", "</think>"));
        let parsed = parse_choice(
            &choice(json!({"content": "just an answer"}), Some("stop")),
            None,
            &caps,
        )
        .unwrap();
        assert_eq!(parsed.result.thought, None);
        assert_eq!(parsed.result.content.as_text(), Some("just an answer"));
        assert!(parsed.diagnostics.any(|d| matches!(d, Diagnostic::ThoughtDelimiterMissing { .. })));
    }

    #[test]
    fn test_no_split_without_configured_delimiters() {
        let caps = lookup("deepseek-reasoner").unwrap();
        let parsed = parse_choice(
            &choice(json!({"content": "<think>x</think>y"}), Some("stop")),
            None,
            &caps,
        )
        .unwrap();
        assert_eq!(parsed.result.thought, None);
        assert_eq!(parsed.result.content.as_text(), Some("<think>x</think>y"));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_no_split_for_non_reasoning_family() {
        let caps = gpt_caps().with_thought_delimiters(ThoughtDelimiters::new("<think>", "</think>"));
        let parsed = parse_choice(
            &choice(json!({"content": "<think>x</think>y"}), Some("stop")),
            None,
            &caps,
        )
        .unwrap();
        assert_eq!(parsed.result.thought, None);
    }

    #[test]
    fn test_split_thought_without_open_marker() {
        let delimiters = ThoughtDelimiters::new("<think>", "</think>");
        assert_eq!(
            split_thought("reasoning</think>answer", &delimiters),
            Some(("reasoning".to_string(), "answer".to_string()))
        );
        assert_eq!(split_thought("no marker", &delimiters), None);
    }

    #[test]
    fn test_finish_reason_normalize() {
        assert_eq!(FinishReason::normalize(Some("stop")), FinishReason::Stop);
        assert_eq!(FinishReason::normalize(Some("end_turn")), FinishReason::Stop);
        assert_eq!(FinishReason::normalize(Some("tool_calls")), FinishReason::ToolCalls);
        assert_eq!(FinishReason::normalize(Some("length")), FinishReason::Length);
        assert_eq!(
            FinishReason::normalize(Some("content_filter")),
            FinishReason::ContentFilter
        );
        assert_eq!(
            FinishReason::normalize(Some("insufficient_system_resource")),
            FinishReason::Other
        );
        assert_eq!(FinishReason::normalize(None), FinishReason::Other);
    }
}
