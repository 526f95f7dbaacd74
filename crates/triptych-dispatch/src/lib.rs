//! Fan-out/fan-in prompt dispatch for Triptych.
//!
//! One call in, one outcome per provider out: the [`dispatcher::Dispatcher`]
//! launches every credentialed provider concurrently, races each call
//! against a shared timeout, and joins all of them — success or failure —
//! into one [`triptych_core::AggregateResult`]. One provider's failure,
//! slowness, or panic never touches another provider's outcome, and the
//! whole cycle is bounded by the timeout rather than the sum of call
//! durations.
//!
//! - [`dispatcher::Dispatcher`] — the fan-out/fan-in engine
//! - [`timeout::with_timeout`] — the single call-vs-timer race combinator

pub mod dispatcher;
pub mod timeout;

// Re-export main types for convenience
pub use dispatcher::{Dispatcher, DEFAULT_TIMEOUT};
pub use timeout::with_timeout;
