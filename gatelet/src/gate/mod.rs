//! Admission gates.
//!
//! Both gates share one skeleton: a tri-state permit decided by a single
//! compare-and-swap, a cancellation flag shared with the handle given
//! downstream, and a terminal latch so the consumer never observes more
//! than one terminal signal.

mod bulkhead;
mod core;
mod rate_limiter;

pub use bulkhead::BulkheadSubscriber;
pub use core::AdmissionError;
pub use rate_limiter::RateLimiterSubscriber;
