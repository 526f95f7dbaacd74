//! Provider layer for Triptych.
//!
//! Each external LLM service sits behind the one capability trait the
//! dispatcher fans out over: `complete(prompt, api_key) -> text`. Two wire
//! formats cover all three providers — the OpenAI-compatible chat
//! completions API (OpenAI, DeepSeek) and the Anthropic messages API.
//!
//! # Architecture
//!
//! - [`traits::CompletionProvider`] — trait that all providers implement
//! - [`registry`] — static specs for the supported providers + default client set
//! - [`chat_completions::ChatCompletionsClient`] — OpenAI-compatible HTTP client
//! - [`anthropic::MessagesClient`] — Anthropic messages-API HTTP client

pub mod anthropic;
pub mod chat_completions;
mod error_body;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use anthropic::MessagesClient;
pub use chat_completions::ChatCompletionsClient;
pub use registry::{
    credentials_from_env, default_providers, find_by_id, ProviderSpec, WireFormat, PROVIDERS,
};
pub use traits::CompletionProvider;
