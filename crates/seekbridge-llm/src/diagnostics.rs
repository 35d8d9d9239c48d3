//! Advisory events raised while shaping requests and reading responses
//!
//! Soft failures do not abort a call. Each one is logged at `warn` and kept in a
//! [`Diagnostics`] list that is handed back with the result, so callers can assert on
//! them without scraping logs.

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// A non-fatal condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A field could not be turned into text for token counting and was skipped
    SerializationSkipped {
        /// Field name
        field: String,
        /// Serializer error
        reason: String,
    },
    /// The backend served a different model than the one requested
    ModelMismatch {
        /// Resolved model
        expected: String,
        /// Model reported by the backend
        actual: String,
    },
    /// Tool calls were present but the backend reported another finish reason
    FinishReasonMismatch {
        /// Backend finish reason
        reported: Option<String>,
    },
    /// Tool call arguments arrived as structured JSON rather than a string
    NonStringToolArguments {
        /// Tool call ID
        call_id: String,
    },
    /// A parameter schema field with no token cost rule
    UnsupportedSchemaField {
        /// Tool name
        tool: String,
        /// Schema field name
        field: String,
    },
    /// No tokenizer is known for the model; counts use the fallback encoding
    UnknownEncoding {
        /// Model id
        model: String,
        /// Encoding used instead
        fallback: String,
    },
    /// Reasoning delimiters were configured but not found in the text
    ThoughtDelimiterMissing {
        /// Expected closing delimiter
        delimiter: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerializationSkipped { field, reason } => {
                write!(f, "could not convert field `{field}` to text, skipping: {reason}")
            }
            Self::ModelMismatch { expected, actual } => write!(
                f,
                "resolved model mismatch: {expected} != {actual}; token and cost estimates may be off"
            ),
            Self::FinishReasonMismatch { reported } => write!(
                f,
                "finish reason mismatch: {} != tool_calls while tool calls are present",
                reported.as_deref().unwrap_or("none")
            ),
            Self::NonStringToolArguments { call_id } => write!(
                f,
                "tool call {call_id} arguments are not a string; converted to JSON text"
            ),
            Self::UnsupportedSchemaField { tool, field } => {
                write!(f, "tool {tool}: schema field `{field}` is not counted")
            }
            Self::UnknownEncoding { model, fallback } => {
                write!(f, "model {model} not found, using {fallback} encoding")
            }
            Self::ThoughtDelimiterMissing { delimiter } => write!(
                f,
                "reasoning delimiter `{delimiter}` not found; treating whole text as content"
            ),
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Log and record a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(diagnostic = %diagnostic, "adapter warning");
        self.0.push(diagnostic);
    }

    /// Append everything from another list without logging again
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in recording order
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Borrow as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Whether any diagnostic matches the predicate
    pub fn any(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.0.iter().any(predicate)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
