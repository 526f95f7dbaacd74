//! Provider registry — static specs for the supported providers.
//!
//! Each [`ProviderSpec`] pins down how one provider is called: endpoint,
//! model, request parameters, and which of the two wire formats it speaks.
//! Adding a provider is one `ProviderId` variant plus one entry here.

use std::sync::Arc;

use triptych_core::{CredentialSet, ProviderId};

use crate::anthropic::MessagesClient;
use crate::chat_completions::ChatCompletionsClient;
use crate::traits::CompletionProvider;

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one provider
// ─────────────────────────────────────────────

/// Which HTTP client implementation a provider needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    /// OpenAI-compatible `POST {base}/chat/completions` with bearer auth.
    OpenAiChat,
    /// Anthropic `POST {base}/v1/messages` with `x-api-key` auth.
    AnthropicMessages,
}

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Which provider this spec describes.
    pub id: ProviderId,
    /// Human-readable name for logs. E.g. `"OpenAI"`.
    pub display_name: &'static str,
    /// Environment variable conventionally holding the API key.
    pub env_key: &'static str,
    /// API base URL, no trailing slash. E.g. `"https://api.openai.com/v1"`.
    pub api_base: &'static str,
    /// Model requested for every completion.
    pub default_model: &'static str,
    /// Response length cap sent with every request.
    pub max_tokens: u32,
    /// Sampling temperature sent with every request.
    pub temperature: f64,
    /// Which client implementation to construct.
    pub wire: WireFormat,
}

// ─────────────────────────────────────────────
// The supported providers (pane order)
// ─────────────────────────────────────────────

/// Complete list of supported provider specifications.
///
/// DeepSeek exposes an OpenAI-compatible API, so it shares the chat
/// completions client with OpenAI and differs only in base URL and model.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        id: ProviderId::OpenAi,
        display_name: "OpenAI",
        env_key: "OPENAI_API_KEY",
        api_base: "https://api.openai.com/v1",
        default_model: "gpt-4-turbo-preview",
        max_tokens: 1024,
        temperature: 0.7,
        wire: WireFormat::OpenAiChat,
    },
    ProviderSpec {
        id: ProviderId::Anthropic,
        display_name: "Anthropic",
        env_key: "ANTHROPIC_API_KEY",
        api_base: "https://api.anthropic.com",
        default_model: "claude-3-5-sonnet-20240620",
        max_tokens: 1024,
        temperature: 0.7,
        wire: WireFormat::AnthropicMessages,
    },
    ProviderSpec {
        id: ProviderId::DeepSeek,
        display_name: "DeepSeek",
        env_key: "DEEPSEEK_API_KEY",
        api_base: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
        max_tokens: 1024,
        temperature: 0.7,
        wire: WireFormat::OpenAiChat,
    },
];

/// Look up the spec for one provider.
pub fn find_by_id(id: ProviderId) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.id == id)
}

/// Build a [`CredentialSet`] from each provider's conventional environment
/// variable.
///
/// Convenience for headless callers; unset or blank variables simply leave
/// that provider uncredentialed, which a dispatch reports as
/// "no API key provided".
pub fn credentials_from_env() -> CredentialSet {
    let mut creds = CredentialSet::new();
    for spec in PROVIDERS {
        if let Ok(api_key) = std::env::var(spec.env_key) {
            creds.insert(spec.id, api_key);
        }
    }
    creds
}

/// Construct the real HTTP clients for every registered provider.
///
/// This is the production client set the dispatcher is built with; tests
/// inject stubs or clients pointed at a mock server instead.
pub fn default_providers() -> Vec<Arc<dyn CompletionProvider>> {
    PROVIDERS
        .iter()
        .map(|spec| match spec.wire {
            WireFormat::OpenAiChat => {
                Arc::new(ChatCompletionsClient::new(spec)) as Arc<dyn CompletionProvider>
            }
            WireFormat::AnthropicMessages => {
                Arc::new(MessagesClient::new(spec)) as Arc<dyn CompletionProvider>
            }
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
