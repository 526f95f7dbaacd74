//! The fan-out/fan-in dispatcher.
//!
//! One dispatch cycle: for every registered provider with a usable
//! credential, spawn one task racing the provider call against the shared
//! timeout; providers without a credential are recorded as failed without
//! a call. All tasks are launched before any is awaited, each with an
//! independent timeout window starting at dispatch time, and the join
//! waits for every task to settle — no early return on first success or
//! first failure. Each task owns its own result slot (its join handle), so
//! assembling the aggregate involves no shared mutable state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use triptych_core::{
    AggregateResult, CredentialSet, ProviderError, ProviderId, ProviderOutcome,
};
use triptych_providers::{default_providers, CompletionProvider};

use crate::timeout::with_timeout;

/// Timeout applied to every provider call unless the caller picks another.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

/// Fans one prompt out to every registered provider and fans the outcomes
/// back in.
///
/// The provider set is constructor-injected so tests run against stubs;
/// [`Dispatcher::default`] registers the real clients for all supported
/// providers. The dispatcher itself never fails: every provider-level
/// problem is a per-provider [`ProviderOutcome::Failure`] entry.
pub struct Dispatcher {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new(default_providers())
    }
}

impl Dispatcher {
    /// Create a dispatcher over an explicit provider set.
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> Self {
        Dispatcher { providers }
    }

    /// Identifiers of the registered providers, in registration order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Run one dispatch cycle: every registered provider, one shared
    /// timeout, one outcome each.
    ///
    /// The prompt is passed through unchanged — rejecting empty prompts is
    /// the caller's business. Wall-clock time is bounded by `timeout` plus
    /// scheduling overhead regardless of how many providers are slow.
    pub async fn dispatch(
        &self,
        prompt: &str,
        credentials: &CredentialSet,
        timeout: Duration,
    ) -> AggregateResult {
        self.dispatch_inner(prompt, credentials, timeout, None).await
    }

    /// [`dispatch`](Self::dispatch) with a cancellation signal.
    ///
    /// When `cancel` is triggered, every still-pending provider unit
    /// settles immediately with `Err("request cancelled")` and its
    /// transport work is abandoned. Already-settled outcomes are kept.
    /// The token is level-triggered: a signal fired before a unit first
    /// checks it — even before this method is called — still cancels.
    pub async fn dispatch_with_cancel(
        &self,
        prompt: &str,
        credentials: &CredentialSet,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> AggregateResult {
        self.dispatch_inner(prompt, credentials, timeout, Some(cancel))
            .await
    }

    /// Call a single provider, for callers driving per-pane progressive
    /// updates instead of one joined cycle.
    ///
    /// Same timeout race and missing-credential handling as a full
    /// dispatch, but the error comes back directly instead of inside an
    /// aggregate record.
    pub async fn complete_one(
        &self,
        id: ProviderId,
        prompt: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredential);
        }
        let provider = self
            .providers
            .iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| {
                ProviderError::Internal(format!("no client registered for provider {}", id))
            })?;

        with_timeout(provider.complete(prompt, api_key), timeout).await
    }

    async fn dispatch_inner(
        &self,
        prompt: &str,
        credentials: &CredentialSet,
        timeout: Duration,
        cancel: Option<CancellationToken>,
    ) -> AggregateResult {
        info!(
            providers = self.providers.len(),
            credentialed = credentials.len(),
            timeout_ms = timeout.as_millis() as u64,
            "dispatching prompt"
        );

        let mut result = AggregateResult::new();
        let mut handles: Vec<(ProviderId, JoinHandle<Result<String, ProviderError>>)> =
            Vec::new();

        // Launch every credentialed provider before awaiting any of them,
        // so each timeout window starts at dispatch time.
        for provider in &self.providers {
            let id = provider.id();
            let Some(api_key) = credentials.get(id) else {
                debug!(provider = %id, "no credential, skipping call");
                result.record(id, ProviderOutcome::failure(ProviderError::MissingCredential));
                continue;
            };

            let provider = Arc::clone(provider);
            let prompt = prompt.to_string();
            let api_key = api_key.to_string();
            let cancel = cancel.clone();

            let handle =
                tokio::spawn(
                    async move { call_one(provider, prompt, api_key, timeout, cancel).await },
                );
            handles.push((id, handle));
        }

        // Settle-all join: wait for every unit, never return early. The
        // tasks run concurrently, so awaiting them in order costs max(),
        // not sum().
        for (id, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(text)) => {
                    debug!(provider = %id, response_len = text.len(), "provider settled ok");
                    ProviderOutcome::success(text)
                }
                Ok(Err(e)) => {
                    warn!(provider = %id, error = %e, "provider settled with failure");
                    ProviderOutcome::failure(e)
                }
                // A panicked task is a defect in our call path, not a
                // provider failure; log it and keep the cycle alive.
                Err(e) => {
                    error!(provider = %id, error = %e, "provider task panicked");
                    ProviderOutcome::failure(ProviderError::Internal(e.to_string()))
                }
            };
            result.record(id, outcome);
        }

        info!(
            succeeded = result.success_count(),
            total = result.len(),
            "dispatch cycle settled"
        );
        result
    }
}

/// One provider unit: the call races the timer, and both race the optional
/// cancellation signal. Whichever settles first wins; the losers are
/// dropped and can never overwrite the recorded outcome.
///
/// `cancelled()` is level-triggered, so a token cancelled before this
/// task's first poll is still observed. The `biased` select checks the
/// token first — a pre-cancelled token settles the unit without issuing
/// the call at all.
async fn call_one(
    provider: Arc<dyn CompletionProvider>,
    prompt: String,
    api_key: String,
    timeout: Duration,
    cancel: Option<CancellationToken>,
) -> Result<String, ProviderError> {
    let call = with_timeout(provider.complete(&prompt, &api_key), timeout);

    match cancel {
        None => call.await,
        Some(cancel) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(provider = %provider.id(), "call cancelled");
                    Err(ProviderError::Cancelled)
                }
                outcome = call => outcome,
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;
    use triptych_providers::{find_by_id, ChatCompletionsClient};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Deterministic stand-in for one provider.
    enum StubBehavior {
        /// Reply with this text after the given delay.
        Reply(&'static str, Duration),
        /// Echo the prompt back immediately.
        Echo,
        /// Never settle on its own.
        Hang,
        /// Fail with this error immediately.
        Fail(ProviderError),
    }

    struct StubProvider {
        id: ProviderId,
        behavior: StubBehavior,
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn complete(&self, prompt: &str, _api_key: &str) -> Result<String, ProviderError> {
            match &self.behavior {
                StubBehavior::Reply(text, delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(text.to_string())
                }
                StubBehavior::Echo => Ok(prompt.to_string()),
                StubBehavior::Hang => std::future::pending().await,
                StubBehavior::Fail(e) => Err(e.clone()),
            }
        }
    }

    fn stub(id: ProviderId, behavior: StubBehavior) -> Arc<dyn CompletionProvider> {
        Arc::new(StubProvider { id, behavior })
    }

    fn all_keys() -> CredentialSet {
        CredentialSet::new()
            .with(ProviderId::OpenAi, "key-1")
            .with(ProviderId::Anthropic, "key-2")
            .with(ProviderId::DeepSeek, "key-3")
    }

    #[tokio::test]
    async fn test_missing_credentials_get_explicit_failure_entries() {
        let dispatcher = Dispatcher::new(vec![
            stub(ProviderId::OpenAi, StubBehavior::Reply("pong", Duration::ZERO)),
            stub(ProviderId::Anthropic, StubBehavior::Echo),
            stub(ProviderId::DeepSeek, StubBehavior::Echo),
        ]);
        let creds = CredentialSet::new().with(ProviderId::OpenAi, "valid-stub-key");

        let result = dispatcher
            .dispatch("ping", &creds, DEFAULT_TIMEOUT)
            .await;

        // Always one entry per registered provider.
        assert_eq!(dispatcher.provider_ids().len(), 3);
        assert_eq!(result.len(), 3);
        assert_eq!(result.get(ProviderId::OpenAi).unwrap().text(), Some("pong"));
        for id in [ProviderId::Anthropic, ProviderId::DeepSeek] {
            assert_eq!(
                result.get(id).unwrap().error_message(),
                Some("no API key provided")
            );
        }
    }

    #[tokio::test]
    async fn test_calls_run_in_parallel_not_in_sequence() {
        let delay = Duration::from_millis(100);
        let dispatcher = Dispatcher::new(vec![
            stub(ProviderId::OpenAi, StubBehavior::Reply("a", delay)),
            stub(ProviderId::Anthropic, StubBehavior::Reply("b", delay)),
            stub(ProviderId::DeepSeek, StubBehavior::Reply("c", delay)),
        ]);

        let started = Instant::now();
        let result = dispatcher
            .dispatch("ping", &all_keys(), DEFAULT_TIMEOUT)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(result.success_count(), 3);
        // Serialized, this would take ≥ 300ms.
        assert!(
            elapsed < Duration::from_millis(250),
            "dispatch took {:?}, calls appear serialized",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_alone() {
        let timeout = Duration::from_millis(200);
        let dispatcher = Dispatcher::new(vec![
            stub(ProviderId::OpenAi, StubBehavior::Reply("fast", Duration::ZERO)),
            stub(ProviderId::Anthropic, StubBehavior::Hang),
            stub(ProviderId::DeepSeek, StubBehavior::Reply("also fast", Duration::ZERO)),
        ]);

        let started = Instant::now();
        let result = dispatcher.dispatch("ping", &all_keys(), timeout).await;
        let elapsed = started.elapsed();

        // The hung provider is cut off at the timeout, not later.
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
        let message = result
            .get(ProviderId::Anthropic)
            .unwrap()
            .error_message()
            .unwrap();
        assert!(message.contains("timed out"), "got: {}", message);

        // The other two are unaffected.
        assert_eq!(result.get(ProviderId::OpenAi).unwrap().text(), Some("fast"));
        assert_eq!(
            result.get(ProviderId::DeepSeek).unwrap().text(),
            Some("also fast")
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_isolated() {
        let dispatcher = Dispatcher::new(vec![
            stub(
                ProviderId::OpenAi,
                StubBehavior::Fail(ProviderError::Transport("connection refused".to_string())),
            ),
            stub(ProviderId::Anthropic, StubBehavior::Reply("fine", Duration::ZERO)),
            stub(ProviderId::DeepSeek, StubBehavior::Reply("fine too", Duration::ZERO)),
        ]);

        let result = dispatcher
            .dispatch("ping", &all_keys(), DEFAULT_TIMEOUT)
            .await;

        assert_eq!(
            result.get(ProviderId::OpenAi).unwrap().error_message(),
            Some("request failed: connection refused")
        );
        assert_eq!(result.get(ProviderId::Anthropic).unwrap().text(), Some("fine"));
        assert_eq!(result.get(ProviderId::DeepSeek).unwrap().text(), Some("fine too"));
    }

    #[tokio::test]
    async fn test_dispatch_is_idempotent_against_deterministic_stubs() {
        let dispatcher = Dispatcher::new(vec![
            stub(ProviderId::OpenAi, StubBehavior::Echo),
            stub(
                ProviderId::Anthropic,
                StubBehavior::Fail(ProviderError::Api {
                    status: 401,
                    message: "bad key".to_string(),
                }),
            ),
            stub(ProviderId::DeepSeek, StubBehavior::Echo),
        ]);

        let first = dispatcher
            .dispatch("same prompt", &all_keys(), DEFAULT_TIMEOUT)
            .await;
        let second = dispatcher
            .dispatch("same prompt", &all_keys(), DEFAULT_TIMEOUT)
            .await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_prompt_passes_through_unvalidated() {
        let dispatcher = Dispatcher::new(vec![stub(ProviderId::OpenAi, StubBehavior::Echo)]);
        let creds = CredentialSet::new().with(ProviderId::OpenAi, "k");

        let result = dispatcher.dispatch("", &creds, DEFAULT_TIMEOUT).await;

        assert_eq!(result.get(ProviderId::OpenAi).unwrap().text(), Some(""));
    }

    #[tokio::test]
    async fn test_cancellation_settles_pending_units() {
        let dispatcher = Dispatcher::new(vec![
            stub(ProviderId::OpenAi, StubBehavior::Hang),
            stub(ProviderId::Anthropic, StubBehavior::Hang),
            stub(ProviderId::DeepSeek, StubBehavior::Reply("done", Duration::ZERO)),
        ]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = dispatcher
            .dispatch_with_cancel("ping", &all_keys(), Duration::from_secs(30), cancel)
            .await;
        let elapsed = started.elapsed();

        // Pending units settle at the signal, not at the 30s timeout.
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
        for id in [ProviderId::OpenAi, ProviderId::Anthropic] {
            assert_eq!(
                result.get(id).unwrap().error_message(),
                Some("request cancelled")
            );
        }
        // A unit that settled before the signal keeps its outcome.
        assert_eq!(result.get(ProviderId::DeepSeek).unwrap().text(), Some("done"));
    }

    #[tokio::test]
    async fn test_cancel_signal_fired_before_dispatch_is_not_lost() {
        let dispatcher = Dispatcher::new(vec![
            stub(ProviderId::OpenAi, StubBehavior::Hang),
            stub(ProviderId::Anthropic, StubBehavior::Hang),
        ]);

        // The signal fires before any provider task exists, let alone
        // polls it. A level-triggered token must still be observed.
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = Instant::now();
        let result = dispatcher
            .dispatch_with_cancel(
                "ping",
                &all_keys(),
                Duration::from_millis(800),
                cancel,
            )
            .await;
        let elapsed = started.elapsed();

        // Settles at the signal, not at the 800ms timeout.
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
        for id in [ProviderId::OpenAi, ProviderId::Anthropic] {
            assert_eq!(
                result.get(id).unwrap().error_message(),
                Some("request cancelled")
            );
        }
    }

    // ── complete_one ──

    #[tokio::test]
    async fn test_complete_one_success() {
        let dispatcher = Dispatcher::new(vec![stub(ProviderId::OpenAi, StubBehavior::Echo)]);

        let text = dispatcher
            .complete_one(ProviderId::OpenAi, "hello", "key", DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_complete_one_blank_credential() {
        let dispatcher = Dispatcher::new(vec![stub(ProviderId::OpenAi, StubBehavior::Echo)]);

        let err = dispatcher
            .complete_one(ProviderId::OpenAi, "hello", "  ", DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::MissingCredential);
    }

    #[tokio::test]
    async fn test_complete_one_times_out() {
        let dispatcher = Dispatcher::new(vec![stub(ProviderId::OpenAi, StubBehavior::Hang)]);

        let limit = Duration::from_millis(50);
        let err = dispatcher
            .complete_one(ProviderId::OpenAi, "hello", "key", limit)
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Timeout(limit));
    }

    #[tokio::test]
    async fn test_complete_one_unregistered_provider() {
        let dispatcher = Dispatcher::new(vec![stub(ProviderId::OpenAi, StubBehavior::Echo)]);

        let err = dispatcher
            .complete_one(ProviderId::DeepSeek, "hello", "key", DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Internal(_)));
    }

    // ── End to end through a real HTTP client ──

    #[tokio::test]
    async fn test_end_to_end_ping_pong_over_http() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "choices": [{ "message": { "content": "pong" } }]
                    }))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&mock_server)
            .await;

        let spec = find_by_id(ProviderId::OpenAi).unwrap();
        let dispatcher = Dispatcher::new(vec![Arc::new(ChatCompletionsClient::with_api_base(
            spec,
            mock_server.uri(),
        ))]);
        let creds = CredentialSet::new().with(ProviderId::OpenAi, "valid-stub-key");

        let result = dispatcher
            .dispatch("ping", &creds, DEFAULT_TIMEOUT)
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result.get(ProviderId::OpenAi).unwrap().text(), Some("pong"));
    }
}
