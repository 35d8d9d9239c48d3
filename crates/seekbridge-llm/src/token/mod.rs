//! Token counting for context budgeting
//!
//! Counts follow the backend's published accounting: a fixed overhead per message,
//! tokenized field values, tile-based image costs, and a calibrated formula for tool
//! schemas. Text is tokenized with `tiktoken-rs`. DeepSeek models use `cl100k_base`;
//! other models tiktoken does not know fall back to it and say so in the diagnostics.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::message::{ContentPart, ImageDetail, ImagePart, Message, UserContent};
use crate::tools::{convert_tools, ToolDescriptor};
use crate::transform::to_wire;
use crate::wire::{ChatContent, ChatContentPart, ChatMessage};
use serde_json::Value;
use std::sync::LazyLock;
use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer};
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};
use tracing::trace;

static CL100K: LazyLock<CoreBPE> = LazyLock::new(|| {
    cl100k_base().expect("cl100k_base tokenizer is a compile-time constant and should never fail")
});

static O200K: LazyLock<CoreBPE> = LazyLock::new(|| {
    o200k_base().expect("o200k_base tokenizer is a compile-time constant and should never fail")
});

const FALLBACK_ENCODING: &str = "cl100k_base";

/// Overhead per message
const TOKENS_PER_MESSAGE: i64 = 3;
/// Extra cost of a `name` field
const TOKENS_PER_NAME: i64 = 1;
/// Every reply is primed with `<|start|>assistant<|message|>`
const REPLY_PRIMING_TOKENS: i64 = 3;

/// Image tile model
pub const IMAGE_BASE_TOKENS: usize = 85;
const IMAGE_TOKENS_PER_TILE: usize = 170;
const IMAGE_MAX_LONG_EDGE: f64 = 2048.0;
const IMAGE_MAX_SHORT_EDGE: f64 = 768.0;
const IMAGE_TILE_SIZE: f64 = 512.0;

/// Tool schema accounting
const TOOL_DISCOUNT: i64 = 2;
const TOOL_FIELD_OVERHEAD: i64 = 2;
const TOOL_ENUM_DISCOUNT: i64 = 3;
const TOOL_ENUM_ITEM_OVERHEAD: i64 = 3;
const TOOL_CLOSING: i64 = 11;
const TOOL_EMPTY_PROPERTIES_DISCOUNT: i64 = 2;
const TOOLS_CLOSING: i64 = 12;

/// Result of a count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCount {
    /// Estimated tokens
    pub tokens: usize,
    /// Fields skipped or not costed
    pub diagnostics: Diagnostics,
}

/// Token counter bound to one model's encoding
#[derive(Clone)]
pub struct TokenCounter {
    bpe: &'static CoreBPE,
    /// Set when `bpe` is the fallback for a model tiktoken does not know
    unknown_model: Option<String>,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("unknown_model", &self.unknown_model)
            .finish_non_exhaustive()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self {
            bpe: &CL100K,
            unknown_model: None,
        }
    }
}

impl TokenCounter {
    /// Counter using the encoding tiktoken associates with `model`
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("deepseek") {
            return Self::default();
        }
        match get_tokenizer(model) {
            Some(Tokenizer::O200kBase) => Self {
                bpe: &O200K,
                unknown_model: None,
            },
            Some(Tokenizer::Cl100kBase) => Self::default(),
            _ => {
                trace!(model, "no tiktoken encoding for model, using cl100k_base");
                Self {
                    bpe: &CL100K,
                    unknown_model: Some(model.to_string()),
                }
            }
        }
    }

    /// Count tokens in a string
    #[must_use]
    pub fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Estimate tokens consumed by a conversation and its tool schemas
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToolName`] if a tool name is unusable.
    pub fn count(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        prepend_name: bool,
    ) -> Result<TokenCount> {
        let mut diagnostics = Diagnostics::new();
        if let Some(model) = &self.unknown_model {
            diagnostics.push(Diagnostic::UnknownEncoding {
                model: model.clone(),
                fallback: FALLBACK_ENCODING.to_string(),
            });
        }

        let mut total: i64 = messages
            .iter()
            .map(|m| self.message_tokens(m, prepend_name, &mut diagnostics))
            .sum();
        total += REPLY_PRIMING_TOKENS;
        total += self.tool_tokens(tools, &mut diagnostics)?;

        Ok(TokenCount {
            tokens: usize::try_from(total.max(0)).unwrap_or(0),
            diagnostics,
        })
    }

    fn text_tokens(&self, text: &str) -> i64 {
        i64::try_from(self.count_text(text)).unwrap_or(i64::MAX)
    }

    fn message_tokens(
        &self,
        message: &Message,
        prepend_name: bool,
        diagnostics: &mut Diagnostics,
    ) -> i64 {
        // image parts are costed from the source message; the wire form has no dimensions
        let images: Vec<&ImagePart> = match message {
            Message::User(user) => match &user.content {
                UserContent::Parts(parts) => parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Image(image) => Some(image),
                        ContentPart::Text { .. } => None,
                    })
                    .collect(),
                UserContent::Text(_) => Vec::new(),
            },
            _ => Vec::new(),
        };
        let mut images = images.into_iter();

        let mut tokens = TOKENS_PER_MESSAGE;
        for wire in to_wire(message, prepend_name) {
            tokens += self.wire_message_tokens(&wire, &mut images, diagnostics);
        }
        tokens
    }

    fn wire_message_tokens<'a>(
        &self,
        wire: &ChatMessage,
        images: &mut impl Iterator<Item = &'a ImagePart>,
        diagnostics: &mut Diagnostics,
    ) -> i64 {
        let mut tokens = self.text_tokens(&wire.role);

        match &wire.content {
            Some(ChatContent::Text(text)) => tokens += self.text_tokens(text),
            Some(ChatContent::Parts(parts)) => {
                for part in parts {
                    tokens += match part {
                        ChatContentPart::ImageUrl { .. } => match images.next() {
                            Some(image) => as_i64(image_tokens(image)),
                            None => self.serialized_tokens("content", part, diagnostics),
                        },
                        ChatContentPart::Text { .. } => {
                            self.serialized_tokens("content", part, diagnostics)
                        }
                    };
                }
            }
            None => {}
        }

        if let Some(name) = &wire.name {
            tokens += self.text_tokens(name) + TOKENS_PER_NAME;
        }
        if let Some(calls) = &wire.tool_calls {
            tokens += self.serialized_tokens("tool_calls", calls, diagnostics);
        }
        if let Some(call_id) = &wire.tool_call_id {
            tokens += self.text_tokens(call_id);
        }
        tokens
    }

    fn serialized_tokens<T: serde::Serialize + ?Sized>(
        &self,
        field: &str,
        value: &T,
        diagnostics: &mut Diagnostics,
    ) -> i64 {
        match serde_json::to_string(value) {
            Ok(text) => self.text_tokens(&text),
            Err(e) => {
                diagnostics.push(Diagnostic::SerializationSkipped {
                    field: field.to_string(),
                    reason: e.to_string(),
                });
                0
            }
        }
    }

    fn value_tokens(&self, field: &str, value: &Value, diagnostics: &mut Diagnostics) -> i64 {
        match value {
            Value::String(text) => self.text_tokens(text),
            other => self.serialized_tokens(field, other, diagnostics),
        }
    }

    fn tool_tokens(&self, tools: &[ToolDescriptor], diagnostics: &mut Diagnostics) -> Result<i64> {
        let mut total = 0;
        for tool in convert_tools(tools)? {
            let function = tool.function;
            let mut tokens = self.text_tokens(&function.name);
            tokens += self.text_tokens(&function.description);
            tokens -= TOOL_DISCOUNT;

            let properties = function
                .parameters
                .get("properties")
                .and_then(Value::as_object);
            let property_count = properties.map_or(0, |p| p.len());

            for (key, schema) in properties.into_iter().flatten() {
                tokens += self.text_tokens(key);
                let Some(fields) = schema.as_object() else {
                    continue;
                };
                for (field, value) in fields {
                    match field.as_str() {
                        "type" | "description" => {
                            tokens += TOOL_FIELD_OVERHEAD + self.value_tokens(field, value, diagnostics);
                        }
                        "enum" => {
                            tokens -= TOOL_ENUM_DISCOUNT;
                            for literal in value.as_array().into_iter().flatten() {
                                tokens += TOOL_ENUM_ITEM_OVERHEAD
                                    + self.value_tokens(field, literal, diagnostics);
                            }
                        }
                        other => diagnostics.push(Diagnostic::UnsupportedSchemaField {
                            tool: function.name.clone(),
                            field: other.to_string(),
                        }),
                    }
                }
            }

            if property_count > 0 {
                tokens += TOOL_CLOSING;
            } else {
                tokens -= TOOL_EMPTY_PROPERTIES_DISCOUNT;
            }
            total += tokens;
        }
        Ok(total + TOOLS_CLOSING)
    }
}

fn as_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Tile-based token cost of one image
///
/// `low` detail costs the base price. Otherwise an image whose long edge exceeds 2048px
/// is scaled down to fit 2048; if that pass leaves both edges above 768px, it is scaled
/// again so the short edge is 768. The result is cut into 512px tiles.
///
/// Images that fit within 2048px are tiled at full size, so mid-size images cost
/// more than a short-edge-768 rule would give: 1500x1500 is 9 tiles (1615 tokens)
/// rather than 4 (765), and 2000x1000 is 8 tiles (1445) rather than 6 (1105). The
/// estimate errs high for those sizes.
#[must_use]
pub fn image_tokens(image: &ImagePart) -> usize {
    image_tokens_for(image.width, image.height, image.detail)
}

/// [`image_tokens`] from raw dimensions
#[must_use]
pub fn image_tokens_for(width: u32, height: u32, detail: ImageDetail) -> usize {
    if detail == ImageDetail::Low || width == 0 || height == 0 {
        return IMAGE_BASE_TOKENS;
    }

    let (mut width, mut height) = (f64::from(width), f64::from(height));

    if width > IMAGE_MAX_LONG_EDGE || height > IMAGE_MAX_LONG_EDGE {
        let aspect_ratio = width / height;
        if aspect_ratio > 1.0 {
            width = IMAGE_MAX_LONG_EDGE;
            height = (IMAGE_MAX_LONG_EDGE / aspect_ratio).trunc();
        } else {
            height = IMAGE_MAX_LONG_EDGE;
            width = (IMAGE_MAX_LONG_EDGE * aspect_ratio).trunc();
        }

        if width > IMAGE_MAX_SHORT_EDGE && height > IMAGE_MAX_SHORT_EDGE {
            let aspect_ratio = width / height;
            if aspect_ratio > 1.0 {
                height = IMAGE_MAX_SHORT_EDGE;
                width = (IMAGE_MAX_SHORT_EDGE * aspect_ratio).trunc();
            } else {
                width = IMAGE_MAX_SHORT_EDGE;
                height = (IMAGE_MAX_SHORT_EDGE / aspect_ratio).trunc();
            }
        }
    }

    // both values are small positive integers here
    let tiles_wide = (width / IMAGE_TILE_SIZE).ceil() as usize;
    let tiles_high = (height / IMAGE_TILE_SIZE).ceil() as usize;
    IMAGE_BASE_TOKENS + IMAGE_TOKENS_PER_TILE * tiles_wide * tiles_high
}

/// Count tokens in a string with the default encoding
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    TokenCounter::default().count_text(text)
}

#[cfg(test)]
mod tests;
