//! Per-provider failure taxonomy.
//!
//! Every way a single provider call can go wrong is caught at the unit
//! boundary and converted into one of these variants; none of them
//! propagate past the dispatcher as a fault. The `Display` strings are
//! shown verbatim in the caller's result pane, so they carry the
//! provider's own message wherever one exists.

use std::time::Duration;

use thiserror::Error;

/// Failure of one provider call within a dispatch cycle.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProviderError {
    /// The provider was registered but no usable credential was supplied.
    #[error("no API key provided")]
    MissingCredential,

    /// The call did not settle within the dispatch timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Network-level failure: DNS, TLS, connection refused, broken pipe.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status.
    /// `message` is the provider's own error message when the error body
    /// parses, else the raw body.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response decoded but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The dispatch cycle was cancelled before this call settled.
    #[error("request cancelled")]
    Cancelled,

    /// A defect in our own call path (e.g. a panicked task). Logged and
    /// surfaced like any other failure, never retried.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// A `Malformed` error for a response whose first content block
    /// carries no text.
    pub fn no_text_content() -> Self {
        ProviderError::Malformed("no text content".to_string())
    }
}
