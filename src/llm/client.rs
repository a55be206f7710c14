// ABOUTME: HTTP client for an OpenAI-compatible chat-completions endpoint
// ABOUTME: Single-attempt completions plus a never-failing variant that labels fallback replies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult};

const SERVICE: &str = "LLM";

/// Prefix marking text that did not come from the model
pub const FALLBACK_LABEL: &str = "[offline]";

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Message with an arbitrary role
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Conversation so far, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

impl CompletionRequest {
    /// Empty request with default sampling
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system message
    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new("system", content));
        self
    }

    /// Append a user message
    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new("user", content));
        self
    }

    /// Append a message with any role
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Override the temperature
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the token limit
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Where a reply's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Generated by the model
    Model,
    /// Canned text used because the model was unavailable
    Fallback,
}

/// Reply text tagged with its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmReply {
    /// Reply text; fallback text starts with [`FALLBACK_LABEL`]
    pub text: String,
    /// Source of the text
    pub source: ReplySource,
}

impl LlmReply {
    /// Whether the model was bypassed
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == ReplySource::Fallback
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client; unconfigured when no URL is set
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    url: Option<String>,
    api_key: String,
    model: String,
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be constructed
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build LLM HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Client with no endpoint; every completion falls back
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            http: Client::new(),
            url: None,
            api_key: String::new(),
            model: LlmConfig::default().model,
        }
    }

    /// Whether an endpoint is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Model name sent with each request
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request one completion
    ///
    /// # Errors
    ///
    /// Returns `external_service_error` when the client is unconfigured, the
    /// request fails, the endpoint answers with a non-success status, or the
    /// body has no completion text
    pub async fn complete(&self, request: &CompletionRequest) -> AppResult<String> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| AppError::external_service(SERVICE, "no endpoint configured"))?;

        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let mut builder = self.http.post(url).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, format!("request failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::external_service(
                SERVICE,
                format!("completion request failed with HTTP {status}"),
            ));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AppError::external_service(SERVICE, format!("JSON parse error: {e}"))
        })?;
        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::external_service(SERVICE, "empty completion"))?;

        debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "LLM completion received"
        );
        Ok(text)
    }

    /// Request one completion, substituting labeled fallback text on any failure
    pub async fn complete_or_fallback(
        &self,
        request: &CompletionRequest,
        fallback: &str,
    ) -> LlmReply {
        match self.complete(request).await {
            Ok(text) => LlmReply {
                text,
                source: ReplySource::Model,
            },
            Err(e) => {
                if self.is_configured() {
                    warn!("LLM unavailable, using fallback reply: {e}");
                } else {
                    debug!("LLM not configured, using fallback reply");
                }
                LlmReply {
                    text: format!("{FALLBACK_LABEL} {fallback}"),
                    source: ReplySource::Fallback,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let request = CompletionRequest::new()
            .system("be brief")
            .user("hi")
            .temperature(0.2)
            .max_tokens(64);
        let body = ChatRequest {
            model: "m",
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn disabled_client_falls_back() {
        let client = LlmClient::disabled();
        assert!(!client.is_configured());
        let reply = client
            .complete_or_fallback(&CompletionRequest::new().user("hello"), "Noted.")
            .await;
        assert!(reply.is_fallback());
        assert_eq!(reply.text, format!("{FALLBACK_LABEL} Noted."));
    }
}
