//! Tests for token counting

use super::*;
use crate::message::ImagePart;
use crate::tools::ToolCall;
use serde_json::json;

fn counter() -> TokenCounter {
    TokenCounter::for_model("deepseek-chat")
}

fn t(text: &str) -> usize {
    counter().count_text(text)
}

#[test]
fn test_count_text() {
    assert!(t("Hello, world!") > 0);
    assert_eq!(t(""), 0);
    assert_eq!(count_tokens("Hello, world!"), t("Hello, world!"));
}

#[test]
fn test_empty_conversation_has_fixed_cost() {
    let count = counter().count(&[], &[], false).unwrap();
    assert_eq!(count.tokens, 3 + 12);
    assert!(count.diagnostics.is_empty());
}

#[test]
fn test_single_message_cost() {
    let messages = vec![Message::system("You are helpful")];
    let count = counter().count(&messages, &[], false).unwrap();
    assert_eq!(count.tokens, 3 + t("system") + t("You are helpful") + 3 + 12);
}

#[test]
fn test_name_field_costs_extra() {
    let messages = vec![Message::user("alice", "hi")];
    let plain = counter().count(&messages, &[], false).unwrap().tokens;
    let named = counter().count(&messages, &[], true).unwrap().tokens;

    let prefixed = t("alice said:\nhi") - t("hi");
    assert_eq!(named, plain + prefixed + t("alice") + 1);
}

#[test]
fn test_tool_result_and_tool_call_fields_are_counted() {
    let call = ToolCall {
        id: "call_1".to_string(),
        name: "search".to_string(),
        arguments: r#"{"q":"rust"}"#.to_string(),
    };
    let assistant = crate::message::AssistantMessage::with_tool_calls("bot", vec![call]).unwrap();
    let messages = vec![
        Message::Assistant(assistant),
        Message::tool_response("call_1", "search", "result text"),
    ];
    let count = counter().count(&messages, &[], false).unwrap();

    let wire_calls = to_wire(&messages[0], false)[0].tool_calls.clone().unwrap();
    let calls_json = serde_json::to_string(&wire_calls).unwrap();
    let expected = (3 + t("assistant") + t(&calls_json))
        + (3 + t("tool") + t("result text") + t("call_1"))
        + 3
        + 12;
    assert_eq!(count.tokens, expected);
}

#[test]
fn test_image_low_detail_is_base_cost() {
    for (w, h) in [(1, 1), (512, 512), (4096, 8192), (10_000, 20)] {
        assert_eq!(image_tokens_for(w, h, ImageDetail::Low), 85);
    }
}

#[test]
fn test_image_2048_square() {
    assert_eq!(image_tokens_for(2048, 2048, ImageDetail::Auto), 85 + 170 * 16);
    assert_eq!(image_tokens_for(2048, 2048, ImageDetail::Auto), 2805);
}

#[test]
fn test_image_oversized_is_scaled_twice() {
    // 4096x2048 -> 2048x1024 -> 1536x768 -> 3x2 tiles
    assert_eq!(image_tokens_for(4096, 2048, ImageDetail::High), 85 + 170 * 6);
    // 4096x4096 -> 2048x2048 -> 768x768 -> 2x2 tiles
    assert_eq!(image_tokens_for(4096, 4096, ImageDetail::Auto), 85 + 170 * 4);
}

#[test]
fn test_image_mid_size_is_tiled_unscaled() {
    // no pass runs below the 2048 long edge
    assert_eq!(image_tokens_for(1500, 1500, ImageDetail::Auto), 85 + 170 * 9);
    assert_eq!(image_tokens_for(2000, 1000, ImageDetail::High), 85 + 170 * 8);
    assert_eq!(image_tokens_for(1000, 2000, ImageDetail::Auto), 1445);
}

#[test]
fn test_image_small_sizes() {
    assert_eq!(image_tokens_for(512, 512, ImageDetail::Auto), 85 + 170);
    assert_eq!(image_tokens_for(513, 100, ImageDetail::Auto), 85 + 170 * 2);
    assert_eq!(image_tokens_for(1024, 1024, ImageDetail::Auto), 85 + 170 * 4);
}

#[test]
fn test_image_in_message_uses_tile_cost() {
    let image = ImagePart::url("https://example.com/a.png", 2048, 2048);
    let messages = vec![Message::user_parts(
        "alice",
        vec![ContentPart::text("describe"), ContentPart::Image(image)],
    )];
    let count = counter().count(&messages, &[], false).unwrap();

    let text_part = serde_json::to_string(&ChatContentPart::Text {
        text: "describe".to_string(),
    })
    .unwrap();
    assert_eq!(count.tokens, 3 + t("user") + t(&text_part) + 2805 + 3 + 12);
}

#[test]
fn test_tool_schema_formula() {
    let tool = ToolDescriptor::new(
        "get_weather",
        "Get weather",
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "City"},
                "unit": {"type": "string", "enum": ["c", "f"]}
            }
        }),
    );
    let count = counter().count(&[], &[tool], false).unwrap();

    let tool_tokens = t("get_weather") + t("Get weather") - 2
        + t("location")
        + (2 + t("string"))
        + (2 + t("City"))
        + t("unit")
        + (2 + t("string"))
        + (3 + t("c") + 3 + t("f"))
        - 3
        + 11;
    assert_eq!(count.tokens, 3 + tool_tokens + 12);
    assert!(count.diagnostics.is_empty());
}

#[test]
fn test_tool_without_properties() {
    let tool = ToolDescriptor::new("noop_tool", "Does nothing at all", json!({}));
    let count = counter().count(&[], &[tool], false).unwrap();
    let tool_tokens = t("noop_tool") + t("Does nothing at all") - 2 - 2;
    assert_eq!(count.tokens, 3 + tool_tokens + 12);
}

#[test]
fn test_tool_name_is_sanitized_before_counting() {
    let raw = ToolDescriptor::new("save file", "Save", json!({}));
    let clean = ToolDescriptor::new("save_file", "Save", json!({}));
    let raw_count = counter().count(&[], &[raw], false).unwrap().tokens;
    let clean_count = counter().count(&[], &[clean], false).unwrap().tokens;
    assert_eq!(raw_count, clean_count);
}

#[test]
fn test_unsupported_schema_field_is_reported() {
    let tool = ToolDescriptor::new(
        "lookup",
        "Lookup",
        json!({"properties": {"id": {"type": "integer", "default": 1}}}),
    );
    let count = counter().count(&[], &[tool], false).unwrap();
    assert!(count.diagnostics.any(|d| matches!(
        d,
        Diagnostic::UnsupportedSchemaField { tool, field } if tool == "lookup" && field == "default"
    )));
}

#[test]
fn test_invalid_tool_name_is_an_error() {
    let tool = ToolDescriptor::new("", "empty", json!({}));
    assert!(counter().count(&[], &[tool], false).is_err());
}

#[test]
fn test_counting_is_deterministic() {
    let messages = vec![
        Message::system("rules"),
        Message::user_parts(
            "alice",
            vec![
                ContentPart::text("what is in this picture?"),
                ContentPart::Image(ImagePart::url("https://example.com/a.png", 1600, 900)),
            ],
        ),
        Message::assistant("bot", "a cat"),
    ];
    let first = counter().count(&messages, &[], true).unwrap();
    for _ in 0..5 {
        assert_eq!(counter().count(&messages, &[], true).unwrap(), first);
    }
}

#[test]
fn test_counting_is_monotonic() {
    let extra = [
        Message::system(""),
        Message::user("alice", "x"),
        Message::assistant("bot", "some reply"),
        Message::tool_response("call_9", "t", ""),
    ];

    let mut messages = vec![Message::user("alice", "start")];
    let mut previous = counter().count(&messages, &[], false).unwrap().tokens;
    for message in extra {
        messages.push(message);
        let next = counter().count(&messages, &[], false).unwrap().tokens;
        assert!(next > previous);
        previous = next;
    }
}

#[test]
fn test_unknown_model_falls_back_with_diagnostic() {
    let fallback = TokenCounter::for_model("acme-large-2");
    let count = fallback.count(&[], &[], false).unwrap();
    assert_eq!(count.tokens, 15);
    assert!(count.diagnostics.any(|d| matches!(
        d,
        Diagnostic::UnknownEncoding { model, fallback } if model == "acme-large-2" && fallback == "cl100k_base"
    )));

    let known = counter().count(&[], &[], false).unwrap();
    assert!(known.diagnostics.is_empty());
    assert_eq!(fallback.count_text("hello world"), t("hello world"));
}
