//! DeepSeek chat client
//!
//! [`DeepSeekClient`] ties the pieces together for one model: it validates the
//! configured create arguments, enforces the model's capabilities before any network
//! I/O, shapes the request, sends it through a [`ChatTransport`], and normalizes the
//! answer. Usage of every completed call is added to the client's running totals.

use crate::capability::{lookup, resolve_model, Capability, CapabilityDescriptor, DEEPSEEK_API_BASE};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::response::{parse_choice, NormalizedResult};
use crate::token::{TokenCount, TokenCounter};
use crate::tools::{convert_tools, ToolChoice, ToolDescriptor};
use crate::transform::{transform, TransformOptions};
use crate::transport::{ChatTransport, HttpTransport};
use crate::usage::{RequestUsage, UsageTotals};
use crate::util::mask_api_key;
use crate::wire::ChatRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Version of the create-argument key sets below
pub const CREATE_ARGS_SCHEMA_VERSION: u32 = 1;

/// Keys accepted in `extra_args`
pub const ALLOWED_EXTRA_ARGS: &[&str] = &[
    "frequency_penalty",
    "logit_bias",
    "logprobs",
    "max_tokens",
    "parallel_tool_calls",
    "presence_penalty",
    "response_format",
    "seed",
    "stop",
    "temperature",
    "tool_choice",
    "top_logprobs",
    "top_p",
    "user",
];

/// Keys the client sets itself
pub const DISALLOWED_EXTRA_ARGS: &[&str] = &["stream", "messages", "function_call", "functions", "n"];

/// Default request timeout; DeepSeek can be slow on long prompts
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Check extra create arguments against the known key sets
///
/// # Errors
/// Returns [`Error::DisallowedArgument`] or [`Error::UnknownArgument`] for the first
/// offending key.
pub fn validate_extra_args(args: &Map<String, Value>) -> Result<()> {
    for key in args.keys() {
        if DISALLOWED_EXTRA_ARGS.contains(&key.as_str()) {
            return Err(Error::DisallowedArgument(key.clone()));
        }
        if !ALLOWED_EXTRA_ARGS.contains(&key.as_str()) {
            return Err(Error::UnknownArgument(key.clone()));
        }
    }
    Ok(())
}

/// Capability implied by a `response_format` create argument
fn response_format_capability(args: &Map<String, Value>) -> Option<Capability> {
    let kind = args
        .get("response_format")
        .and_then(|format| format.get("type"))
        .and_then(Value::as_str)?;
    match kind {
        "json_object" => Some(Capability::JsonOutput),
        "json_schema" => Some(Capability::StructuredOutput),
        _ => None,
    }
}

/// Typed sampling arguments sent with every request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateArgs {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling mass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Completion token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Presence penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Frequency penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Sampling seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// End-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Tool selection strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl CreateArgs {
    fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::Config(format!("create args must be an object, got {other}"))),
            Err(e) => Err(Error::Config(format!("invalid create args: {e}"))),
        }
    }
}

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Model id
    pub model: String,
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Send the speaker's name with user and assistant messages
    pub add_name_prefixes: bool,
    /// Overrides the built-in capability table
    pub capabilities: Option<CapabilityDescriptor>,
    /// Typed create arguments
    pub create_args: CreateArgs,
    /// Further create arguments, checked against [`ALLOWED_EXTRA_ARGS`]
    pub extra_args: Map<String, Value>,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("model", &self.model)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("add_name_prefixes", &self.add_name_prefixes)
            .field("capabilities", &self.capabilities)
            .field("create_args", &self.create_args)
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration for `model`
    #[must_use]
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: DEEPSEEK_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            add_name_prefixes: false,
            capabilities: None,
            create_args: CreateArgs::default(),
            extra_args: Map::new(),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send speaker names
    #[must_use]
    pub fn with_name_prefixes(mut self, enabled: bool) -> Self {
        self.add_name_prefixes = enabled;
        self
    }

    /// Override the capability descriptor
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilityDescriptor) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Set typed create arguments
    #[must_use]
    pub fn with_create_args(mut self, create_args: CreateArgs) -> Self {
        self.create_args = create_args;
        self
    }

    /// Add one extra create argument
    #[must_use]
    pub fn with_extra_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_args.insert(key.into(), value);
        self
    }

    /// Resolve the capability descriptor
    ///
    /// # Errors
    /// Returns a configuration error when the model is empty, when an extra argument
    /// is not allowed, when the model is unknown and no override is set, or when a
    /// `response_format` extra argument asks for output the model cannot produce.
    pub fn validate(&self) -> Result<CapabilityDescriptor> {
        if self.model.trim().is_empty() {
            return Err(Error::MissingField("model"));
        }
        validate_extra_args(&self.extra_args)?;
        let capabilities = match &self.capabilities {
            Some(capabilities) => capabilities.clone(),
            None => lookup(&self.model)?,
        };
        if let Some(capability) = response_format_capability(&self.extra_args) {
            capabilities.require(capability)?;
        }
        Ok(capabilities)
    }
}

/// Requested response format
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OutputFormat {
    /// Free text
    #[default]
    Text,
    /// Any JSON object
    Json,
    /// JSON following a schema
    Structured(Value),
}

impl OutputFormat {
    fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::Text => None,
            Self::Json => Some(Capability::JsonOutput),
            Self::Structured(_) => Some(Capability::StructuredOutput),
        }
    }

    /// DeepSeek only understands `json_object`; schema adherence is left to the prompt
    fn response_format(&self) -> Option<Value> {
        match self {
            Self::Text => None,
            Self::Json | Self::Structured(_) => Some(json!({"type": "json_object"})),
        }
    }
}

/// Result of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Normalized result
    pub result: NormalizedResult,
    /// Warnings raised while shaping the request and reading the response
    pub diagnostics: Diagnostics,
}

/// Chat client for one DeepSeek model
pub struct DeepSeekClient {
    transport: Arc<dyn ChatTransport>,
    model: String,
    capabilities: CapabilityDescriptor,
    add_name_prefixes: bool,
    create_args: Map<String, Value>,
    counter: TokenCounter,
    usage: UsageTotals,
}

impl fmt::Debug for DeepSeekClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSeekClient")
            .field("model", &self.model)
            .field("capabilities", &self.capabilities)
            .field("add_name_prefixes", &self.add_name_prefixes)
            .field("create_args", &self.create_args)
            .finish_non_exhaustive()
    }
}

impl DeepSeekClient {
    /// Create a client that talks HTTP to `config.base_url`
    ///
    /// # Errors
    /// Returns a configuration error for an invalid config or a missing API key.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingField("api_key"));
        }
        let transport = HttpTransport::new(&config.base_url, &config.api_key, config.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a caller-supplied transport
    ///
    /// # Errors
    /// Returns a configuration error for an invalid config.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        let capabilities = config.validate()?;
        let mut create_args = config.create_args.to_map()?;
        create_args.extend(config.extra_args);

        debug!(model = %config.model, ?capabilities, "DeepSeek client created");

        Ok(Self {
            transport,
            counter: TokenCounter::for_model(&config.model),
            model: config.model,
            capabilities,
            add_name_prefixes: config.add_name_prefixes,
            create_args,
            usage: UsageTotals::new(),
        })
    }

    /// Model id
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Capability descriptor in effect
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityDescriptor {
        &self.capabilities
    }

    fn check_capabilities(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        output: &OutputFormat,
    ) -> Result<()> {
        if messages.iter().any(Message::has_images) {
            self.capabilities.require(Capability::Vision)?;
        }
        if let Some(capability) = output.required_capability() {
            self.capabilities.require(capability)?;
        }
        if !tools.is_empty() {
            self.capabilities.require(Capability::FunctionCalling)?;
        }
        Ok(())
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        output: &OutputFormat,
        extra_args: &Map<String, Value>,
    ) -> Result<ChatRequest> {
        validate_extra_args(extra_args)?;
        self.check_capabilities(messages, tools, output)?;
        if let Some(capability) = response_format_capability(extra_args) {
            self.capabilities.require(capability)?;
        }

        let mut args = self.create_args.clone();
        args.extend(extra_args.clone());
        if let Some(format) = output.response_format() {
            args.insert("response_format".to_string(), format);
        }

        let tools = if tools.is_empty() {
            None
        } else {
            Some(convert_tools(tools)?)
        };

        let messages = transform(
            messages,
            TransformOptions {
                capabilities: &self.capabilities,
                model: &self.model,
                prepend_name: self.add_name_prefixes,
            },
        )?;

        Ok(ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            tools,
            args,
        })
    }

    /// Send one completion request
    ///
    /// Configuration and capability checks run before any I/O. When `cancel` fires
    /// first, the in-flight request is dropped, [`Error::Cancelled`] is returned, and
    /// usage totals are left unchanged.
    ///
    /// # Errors
    /// Configuration errors, [`Error::Cancelled`], or backend and network errors.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn create(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        output: &OutputFormat,
        extra_args: &Map<String, Value>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Completion> {
        let request = self.build_request(messages, tools, output, extra_args)?;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }

        debug!(
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "dispatching chat request"
        );

        let response = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        info!("chat request cancelled");
                        return Err(Error::Cancelled);
                    }
                    response = self.transport.send(&request) => response?,
                }
            }
            None => self.transport.send(&request).await?,
        };

        let mut diagnostics = Diagnostics::new();
        let expected = resolve_model(&self.model);
        if !response.model.is_empty() && response.model != expected {
            diagnostics.push(Diagnostic::ModelMismatch {
                expected: expected.to_string(),
                actual: response.model.clone(),
            });
        }

        let choice = response
            .choices
            .first()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;
        let parsed = parse_choice(choice, response.usage, &self.capabilities)?;
        diagnostics.extend(parsed.diagnostics);

        let usage = parsed.result.usage;
        self.usage.record(usage);

        info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            finish_reason = parsed.result.finish_reason.as_str(),
            "chat completion finished"
        );

        Ok(Completion {
            result: parsed.result,
            diagnostics,
        })
    }

    /// Usage of calls that reached the backend
    #[must_use]
    pub fn actual_usage(&self) -> RequestUsage {
        self.usage.actual()
    }

    /// Usage including cached calls
    #[must_use]
    pub fn total_usage(&self) -> RequestUsage {
        self.usage.total()
    }

    /// Reset usage totals to zero
    pub fn reset_usage(&self) {
        self.usage.reset();
    }

    /// Estimate the prompt tokens of a conversation with these tools
    ///
    /// # Errors
    /// Returns [`Error::InvalidToolName`] if a tool name is unusable.
    pub fn count_tokens(&self, messages: &[Message], tools: &[ToolDescriptor]) -> Result<TokenCount> {
        self.counter.count(messages, tools, self.add_name_prefixes)
    }

    /// Tokens left in the model's context window, never below zero
    ///
    /// # Errors
    /// Returns [`Error::InvalidToolName`] if a tool name is unusable.
    pub fn remaining_tokens(&self, messages: &[Message], tools: &[ToolDescriptor]) -> Result<usize> {
        let count = self.count_tokens(messages, tools)?;
        Ok(self.capabilities.token_limit.saturating_sub(count.tokens))
    }
}
