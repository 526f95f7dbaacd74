//! OpenAI-compatible chat completions client.
//!
//! Covers every provider speaking the `/chat/completions` wire format —
//! here that is OpenAI itself and DeepSeek, which differ only in base URL
//! and model name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use triptych_core::{ProviderError, ProviderId};

use crate::error_body::api_error;
use crate::registry::ProviderSpec;
use crate::traits::CompletionProvider;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────
// ChatCompletionsClient
// ─────────────────────────────────────────────

/// HTTP client for one OpenAI-compatible provider.
///
/// Holds a pooled `reqwest::Client` and the provider's static spec; the
/// API key arrives per call. No request deadline is set here — the
/// dispatcher races every call against its own timer.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_base: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("provider", &self.spec.display_name)
            .field("api_base", &self.api_base)
            .field("model", &self.spec.default_model)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Create a client for the spec's production endpoint.
    pub fn new(spec: &'static ProviderSpec) -> Self {
        Self::with_api_base(spec, spec.api_base)
    }

    /// Create a client against an explicit base URL (mock servers, proxies).
    pub fn with_api_base(spec: &'static ProviderSpec, api_base: impl Into<String>) -> Self {
        ChatCompletionsClient {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            spec,
        }
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionsClient {
    fn id(&self) -> ProviderId {
        self.spec.id
    }

    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, ProviderError> {
        debug!(
            provider = self.spec.display_name,
            model = self.spec.default_model,
            prompt_len = prompt.len(),
            "calling chat completions API"
        );

        let request_body = ChatRequest {
            model: self.spec.default_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.spec.max_tokens,
            temperature: self.spec.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
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

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = self.spec.display_name, error = %e, "failed to parse response");
            ProviderError::Malformed(e.to_string())
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed("empty choices array".to_string()))?;

        // A null content (e.g. a pure tool-call reply) surfaces as "".
        Ok(choice.message.content.unwrap_or_default())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
