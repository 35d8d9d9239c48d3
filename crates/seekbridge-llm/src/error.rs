//! Error types for seekbridge-llm

use crate::capability::Capability;
use thiserror::Error;

/// Adapter error type
#[derive(Debug, Error)]
pub enum Error {
    /// Generic configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration field is missing or empty
    #[error("required field is missing: {0}")]
    MissingField(&'static str),

    /// A create argument that this client manages itself was supplied by the caller
    #[error("disallowed create argument: {0}")]
    DisallowedArgument(String),

    /// A create argument outside the known schema
    #[error("unknown create argument: {0}")]
    UnknownArgument(String),

    /// System messages are split by other messages and the backend takes only one
    #[error(
        "multiple non-contiguous system messages are not supported when the model does not accept multiple system messages"
    )]
    NonContiguousSystemMessages,

    /// The model does not support a requested capability
    #[error("model does not support {0}")]
    Unsupported(Capability),

    /// Tool name violates the `[A-Za-z0-9_-]{1,64}` rule
    #[error("invalid tool name: {0:?}")]
    InvalidToolName(String),

    /// The backend answered through the deprecated `function_call` field
    #[error("function_call is deprecated and not supported by this client")]
    LegacyFunctionCall,

    /// No built-in capability entry and no override was supplied
    #[error("capabilities are required for unknown model: {0}")]
    UnknownModel(String),

    /// The call was aborted through its cancellation token
    #[error("request cancelled")]
    Cancelled,

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Settings could not be loaded
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl Error {
    /// Whether this error was raised before any network I/O because of bad configuration
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingField(_)
                | Self::DisallowedArgument(_)
                | Self::UnknownArgument(_)
                | Self::NonContiguousSystemMessages
                | Self::Unsupported(_)
                | Self::InvalidToolName(_)
                | Self::LegacyFunctionCall
                | Self::UnknownModel(_)
                | Self::Settings(_)
        )
    }

    /// Whether the call was cancelled by its caller
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
