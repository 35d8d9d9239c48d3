//! Chat-completion transport
//!
//! [`ChatTransport`] is the seam between request orchestration and the network. The
//! client only needs one non-streaming call; tests substitute their own transport.

use crate::error::{Error, Result};
use crate::util::{mask_api_key, sanitize_api_error};
use crate::wire::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Sends one chat-completion request and returns the decoded response
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// OpenAI-compatible HTTP transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport for `base_url`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_send_error(&self, error: &reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            Error::Network(sanitize_api_error(&error.to_string()))
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(messages = request.messages.len(), "Sending request to DeepSeek");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "{}: {}",
                status.as_u16(),
                sanitize_api_error(&error_text)
            )));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_api_key() {
        let transport = HttpTransport::new(
            "https://api.deepseek.com/v1/",
            "sk-1234567890abcdefghij",
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{transport:?}");
        assert!(!debug.contains("567890"));
        assert!(debug.contains("sk-1...ghij"));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let transport =
            HttpTransport::new("https://api.deepseek.com/v1/", "key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            transport.endpoint(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }
}
