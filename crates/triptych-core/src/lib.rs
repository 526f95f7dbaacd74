//! Core types for Triptych — the shared vocabulary of one dispatch cycle.
//!
//! A dispatch cycle takes one prompt and a [`types::CredentialSet`], calls
//! every registered provider concurrently, and returns an
//! [`types::AggregateResult`] with one [`types::ProviderOutcome`] per
//! provider. Everything here is transient: built for one cycle, dropped
//! when it returns.
//!
//! - [`types`] — provider identifiers, credentials, outcomes
//! - [`error`] — the per-provider failure taxonomy

pub mod error;
pub mod types;

// Re-export main types for convenience
pub use error::ProviderError;
pub use types::{AggregateResult, CredentialSet, ProviderId, ProviderOutcome};
