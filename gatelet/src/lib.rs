//! gatelet: admission-controlled gates for push-based event streams.
//!
//! A gate sits between an upstream producer and a downstream subscriber,
//! makes one race-free admission decision per subscription, and then
//! enforces it across every later lifecycle signal. Two policies ship:
//!
//! - [`RateLimiterSubscriber`]: one timed permission at subscribe, one
//!   more per element after the first — "N elements over a window".
//! - [`BulkheadSubscriber`]: one concurrency slot at subscribe, released
//!   exactly once when the stream terminates — "N streams in flight".
//!
//! The accounting behind the policies stays outside the crate; gates
//! consume it through the [`RateLimiter`] and [`Bulkhead`] traits and
//! surface denials as [`AdmissionError`] values on the error channel.

mod gate;
mod policy;
mod stream;

#[cfg(test)]
mod test_support;

pub use gate::{AdmissionError, BulkheadSubscriber, RateLimiterSubscriber};
pub use policy::{Bulkhead, RateLimiter};
pub use stream::{StreamError, Subscriber, Subscription};
