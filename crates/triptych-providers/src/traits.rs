//! The provider capability trait.
//!
//! One interface, N implementations — the dispatcher never knows which
//! wire format sits behind a provider, only that it can turn a prompt and
//! a credential into text or a [`ProviderError`].

use async_trait::async_trait;

use triptych_core::{ProviderError, ProviderId};

/// One external LLM service the dispatcher can fan out to.
///
/// Implementations hold connection state (base URL, pooled HTTP client,
/// request parameters) but never a credential — the API key is a per-call
/// argument, so one client instance serves any key and test stubs need no
/// setup.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Which provider this client talks to.
    fn id(&self) -> ProviderId;

    /// Send one prompt and return the provider's response text.
    ///
    /// Every failure mode — transport, non-2xx, unexpected shape — comes
    /// back as a [`ProviderError`]; nothing panics and nothing is retried.
    /// No deadline is enforced here: the dispatcher owns the timeout.
    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, ProviderError>;
}
