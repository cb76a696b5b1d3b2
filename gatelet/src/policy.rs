//! Admission policy capabilities consumed by the gates.
//!
//! The accounting behind these traits (refresh windows, slot counters)
//! lives outside this crate; gates only consume the decision surface.
//! One policy object is shared across many concurrent gate instances, so
//! implementations must be safe to call from any thread.

use std::time::Duration;

/// Time-windowed admission: each granted call consumes one unit of
/// allowance within the limiter's refresh window.
pub trait RateLimiter: Send + Sync {
    /// Limiter name, used in denial errors and logs.
    fn name(&self) -> &str;

    /// Per-attempt wait budget, from the limiter's own configuration.
    fn timeout_duration(&self) -> Duration;

    /// Attempt to take one unit of allowance, waiting up to `timeout` for
    /// the window to refresh. May block the calling thread; this is the
    /// gate's deliberate backpressure point.
    fn try_acquire_permission(&self, timeout: Duration) -> bool;
}

/// Fixed-concurrency admission: a bounded number of calls in flight at
/// once.
pub trait Bulkhead: Send + Sync {
    /// Bulkhead name, used in denial errors and logs.
    fn name(&self) -> &str;

    /// Attempt to claim one concurrency slot. Non-blocking.
    fn is_call_permitted(&self) -> bool;

    /// Return a previously claimed slot. The bulkhead does not deduplicate
    /// releases; callers must invoke this exactly once per granted
    /// [`is_call_permitted`](Bulkhead::is_call_permitted).
    fn on_complete(&self);
}
