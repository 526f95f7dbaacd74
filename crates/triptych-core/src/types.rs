//! Dispatch-cycle types — providers, credentials, outcomes.
//!
//! All of these live for exactly one dispatch cycle. The caller builds a
//! [`CredentialSet`] from user input, hands it to the dispatcher, and gets
//! back an [`AggregateResult`] keyed by [`ProviderId`]. Nothing here is
//! persisted and nothing is mutated after the cycle returns.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

// ─────────────────────────────────────────────
// ProviderId
// ─────────────────────────────────────────────

/// Identifier of one external LLM provider.
///
/// Fixed at three members today, but nothing downstream assumes three:
/// adding a provider means adding a variant here plus one registry entry.
/// Serializes to the lowercase identifier (`"openai"`, `"anthropic"`,
/// `"deepseek"`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    DeepSeek,
}

impl ProviderId {
    /// All known providers, in pane order.
    pub const ALL: &'static [ProviderId] = &[
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::DeepSeek,
    ];

    /// The lowercase wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::DeepSeek => "deepseek",
        }
    }

    /// Human-readable name for logs and pane headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Anthropic => "Anthropic",
            ProviderId::DeepSeek => "DeepSeek",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "anthropic" => Ok(ProviderId::Anthropic),
            "deepseek" => Ok(ProviderId::DeepSeek),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

// ─────────────────────────────────────────────
// CredentialSet
// ─────────────────────────────────────────────

/// Per-request API keys, one per provider the user wants queried.
///
/// Invariant: an empty or whitespace-only secret is never stored, so
/// "present in the set" and "has a usable credential" are the same test.
/// Built by the caller from user input, dropped after the cycle.
#[derive(Clone, Debug, Default)]
pub struct CredentialSet {
    keys: HashMap<ProviderId, String>,
}

impl CredentialSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential. Blank secrets are dropped, not stored.
    pub fn insert(&mut self, provider: ProviderId, api_key: impl Into<String>) {
        let api_key = api_key.into();
        if !api_key.trim().is_empty() {
            self.keys.insert(provider, api_key);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, provider: ProviderId, api_key: impl Into<String>) -> Self {
        self.insert(provider, api_key);
        self
    }

    /// The credential for one provider, if a usable one was supplied.
    pub fn get(&self, provider: ProviderId) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Whether a usable credential exists for this provider.
    pub fn contains(&self, provider: ProviderId) -> bool {
        self.keys.contains_key(&provider)
    }

    /// Number of providers with a usable credential.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no provider has a usable credential.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ─────────────────────────────────────────────
// ProviderOutcome
// ─────────────────────────────────────────────

/// The settled result of one provider's call: text or a failure message,
/// exactly one of the two by construction.
///
/// Serialized with a `status` tag so the UI caller can switch on it:
/// `{"status": "success", "text": ...}` or
/// `{"status": "failure", "message": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProviderOutcome {
    Success { text: String },
    Failure { message: String },
}

impl ProviderOutcome {
    /// A successful outcome carrying the provider's text.
    pub fn success(text: impl Into<String>) -> Self {
        ProviderOutcome::Success { text: text.into() }
    }

    /// A failed outcome carrying a human-readable message.
    pub fn failure(message: impl fmt::Display) -> Self {
        ProviderOutcome::Failure {
            message: message.to_string(),
        }
    }

    /// Whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, ProviderOutcome::Success { .. })
    }

    /// The response text, if successful.
    pub fn text(&self) -> Option<&str> {
        match self {
            ProviderOutcome::Success { text } => Some(text),
            ProviderOutcome::Failure { .. } => None,
        }
    }

    /// The failure message, if failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ProviderOutcome::Success { .. } => None,
            ProviderOutcome::Failure { message } => Some(message),
        }
    }
}

impl From<Result<String, ProviderError>> for ProviderOutcome {
    fn from(result: Result<String, ProviderError>) -> Self {
        match result {
            Ok(text) => ProviderOutcome::Success { text },
            Err(e) => ProviderOutcome::failure(e),
        }
    }
}

// ─────────────────────────────────────────────
// AggregateResult
// ─────────────────────────────────────────────

/// One outcome per registered provider for a single dispatch cycle.
///
/// Providers without a usable credential are present with a
/// `Failure("no API key provided")` entry, so the map always covers the
/// full registered set. Keyed by provider identity — entry order carries
/// no meaning.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AggregateResult {
    outcomes: HashMap<ProviderId, ProviderOutcome>,
}

impl AggregateResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one provider's outcome.
    pub fn record(&mut self, provider: ProviderId, outcome: ProviderOutcome) {
        self.outcomes.insert(provider, outcome);
    }

    /// The outcome for one provider, if it was registered.
    pub fn get(&self, provider: ProviderId) -> Option<&ProviderOutcome> {
        self.outcomes.get(&provider)
    }

    /// Iterate over all recorded outcomes.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderId, &ProviderOutcome)> {
        self.outcomes.iter().map(|(id, outcome)| (*id, outcome))
    }

    /// Number of recorded outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of successful outcomes.
    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
