
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{Completer, CompletionRequest, Message};
use crate::config::AnthropicConfig;
use crate::{RepoChatError, Result};

pub const DEFAULT_CHAT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const API_VERSION: &str = "2023-06-01";

/// Blocking client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    messages_url: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
    agent: ureq::Agent,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("messages_url", &self.messages_url.as_str())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicClient {
    /// Build a client with the key from `ANTHROPIC_API_KEY`
    #[inline]
    pub fn from_env(config: &AnthropicConfig) -> Result<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Build a client with the key returned by `lookup(API_KEY_VAR)`.
    ///
    /// A missing or blank key is a `MissingCredential` error.
    #[inline]
    pub fn from_lookup<F>(config: &AnthropicConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(RepoChatError::MissingCredential { var: API_KEY_VAR })?;

        Self::new(config, api_key)
    }

    #[inline]
    pub fn new(config: &AnthropicConfig, api_key: String) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid Anthropic base URL: {}", config.base_url))?;
        let messages_url = base_url
            .join("/v1/messages")
            .context("Failed to build messages URL")?;

        // Error bodies carry the API's explanation, so statuses are inspected by hand
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            messages_url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            agent,
        })
    }

    fn send(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
        };
        let body_json =
            serde_json::to_string(&body).context("Failed to serialize messages request")?;

        debug!(
            "Sending {} messages to {} ({})",
            request.messages.len(),
            self.messages_url,
            self.model
        );

        let mut response = self
            .agent
            .post(self.messages_url.as_str())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .send(&body_json)
            .with_context(|| format!("Could not reach {}", self.messages_url))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read messages response")?;

        if !(200..300).contains(&status) {
            let detail = serde_json::from_str::<ErrorResponse>(&text).map_or_else(
                |_| text.trim().to_string(),
                |e| format!("{}: {}", e.error.kind, e.error.message),
            );
            warn!("Anthropic API returned HTTP {}: {}", status, detail);
            anyhow::bail!("HTTP {}: {}", status, detail);
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&text).context("Failed to parse messages response")?;

        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            warn!("Answer was cut off at {} tokens", request.max_tokens);
        }

        let answer: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if answer.is_empty() {
            anyhow::bail!("Response contained no text");
        }
        Ok(answer)
    }
}

impl Completer for AnthropicClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.send(request)
            .map_err(|e| RepoChatError::Completion(format!("{:#}", e)))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
