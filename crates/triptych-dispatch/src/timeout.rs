//! The call-vs-timer race, implemented once.
//!
//! Every provider unit is wrapped in the same combinator: the real call and
//! a timer run concurrently, whichever settles first wins, and the loser is
//! dropped. Abandonment is best effort — the transport work may still be in
//! flight when the future is dropped, but its result can never be observed.

use std::future::Future;
use std::time::Duration;

use triptych_core::ProviderError;

/// Race a fallible unit of work against a timer.
///
/// Resolves to the unit's own result if it settles within `limit`, else to
/// `Err(ProviderError::Timeout(limit))`.
pub async fn with_timeout<T>(
    work: impl Future<Output = Result<T, ProviderError>>,
    limit: Duration,
) -> Result<T, ProviderError> {
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}
