//! Anthropic messages-API client.
//!
//! Anthropic does not speak the chat completions format: auth is an
//! `x-api-key` header, the endpoint is `/v1/messages`, and the reply is an
//! array of typed content blocks rather than a `choices` list. We take the
//! first block; anything but a text block is a malformed response from
//! this caller's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use triptych_core::{ProviderError, ProviderId};

use crate::error_body::api_error;
use crate::registry::ProviderSpec;
use crate::traits::CompletionProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// One content block of an Anthropic reply. Only text blocks carry a
/// usable answer here; tool-use and thinking blocks collapse to `Other`.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

// ─────────────────────────────────────────────
// MessagesClient
// ─────────────────────────────────────────────

/// HTTP client for the Anthropic messages API.
pub struct MessagesClient {
    client: reqwest::Client,
    api_base: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for MessagesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagesClient")
            .field("provider", &self.spec.display_name)
            .field("api_base", &self.api_base)
            .field("model", &self.spec.default_model)
            .finish()
    }
}

impl MessagesClient {
    /// Create a client for the spec's production endpoint.
    pub fn new(spec: &'static ProviderSpec) -> Self {
        Self::with_api_base(spec, spec.api_base)
    }

    /// Create a client against an explicit base URL (mock servers, proxies).
    pub fn with_api_base(spec: &'static ProviderSpec, api_base: impl Into<String>) -> Self {
        MessagesClient {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            spec,
        }
    }

    /// Build the full messages URL.
    fn messages_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/v1/messages", base)
    }
}

#[async_trait]
impl CompletionProvider for MessagesClient {
    fn id(&self) -> ProviderId {
        self.spec.id
    }

    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, ProviderError> {
        debug!(
            provider = self.spec.display_name,
            model = self.spec.default_model,
            prompt_len = prompt.len(),
            "calling messages API"
        );

        let request_body = MessagesRequest {
            model: self.spec.default_model,
            max_tokens: self.spec.max_tokens,
            temperature: self.spec.temperature,
            messages: vec![UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = self.spec.display_name, error = %e, "HTTP request failed");
                ProviderError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %body,
                "API error"
            );
            return Err(api_error(status, &body));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            error!(provider = self.spec.display_name, error = %e, "failed to parse response");
            ProviderError::Malformed(e.to_string())
        })?;

        // First content block only; a non-text block means no usable answer.
        match parsed.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => Ok(text),
            _ => Err(ProviderError::no_text_content()),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
