//! Bounded-concurrency fan-out over live worker records.
//!
//! ## Structure
//!
//! - [`Concurrency`] - validated in-flight ceiling (default
//!   [`DEFAULT_CONCURRENCY`]).
//! - [`Traversal`] - one-shot `map`/`each` driver built on
//!   [`futures::stream::FuturesUnordered`].

mod concurrency;
mod traversal;

pub use concurrency::*;
pub use traversal::*;
