//! Shared non-2xx error-body handling.
//!
//! Both the OpenAI-compatible and Anthropic APIs report failures as
//! `{"error": {"message": ...}}`. The provider's own message is what the
//! user needs to see (quota, bad key), so we extract it when the body
//! parses and fall back to the raw body when it does not.

use reqwest::StatusCode;
use serde::Deserialize;

use triptych_core::ProviderError;

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Convert a non-2xx response body into a [`ProviderError::Api`].
pub(crate) fn api_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}
