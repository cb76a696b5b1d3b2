//! Rate-limited gate: admission re-checked on the cadence of elements.

use std::sync::Arc;

use crate::gate::core::{AdmissionError, GateCore};
use crate::policy::RateLimiter;
use crate::stream::{StreamError, Subscriber, Subscription};

/// Wraps a downstream subscriber in a rate limiter.
///
/// One permission is consumed at subscription time and pays for the first
/// element; every later element re-acquires before it is forwarded, so a
/// stream is metered as "N elements over a window" rather than admitted
/// once. A failed acquisition anywhere cancels the upstream and replaces
/// all further traffic with a single
/// [`AdmissionError::RateLimitExceeded`].
pub struct RateLimiterSubscriber<T, S: Subscriber<T>> {
    limiter: Arc<dyn RateLimiter>,
    // Consumed by the first element. The subscription-time acquisition
    // already paid for it; charging again would double-count.
    first_event: bool,
    core: GateCore<T, S>,
}

impl<T, S: Subscriber<T>> RateLimiterSubscriber<T, S> {
    pub fn new(limiter: Arc<dyn RateLimiter>, downstream: S) -> Self {
        Self {
            limiter,
            first_event: true,
            core: GateCore::new(downstream),
        }
    }

    fn denied(&self) -> AdmissionError {
        AdmissionError::RateLimitExceeded {
            name: self.limiter.name().to_string(),
        }
    }
}

impl<T, S: Subscriber<T>> Subscriber<T> for RateLimiterSubscriber<T, S> {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        let limiter = Arc::clone(&self.limiter);
        let name = self.limiter.name().to_string();
        self.core.admit(
            subscription,
            move || limiter.try_acquire_permission(limiter.timeout_duration()),
            move || {
                tracing::debug!(limiter = %name, "permission denied at subscribe");
                AdmissionError::RateLimitExceeded { name }
            },
        );
    }

    fn on_next(&mut self, element: T) {
        if !self.core.ready_for_next() {
            return;
        }

        let exempt = std::mem::replace(&mut self.first_event, false);
        if exempt
            || self
                .limiter
                .try_acquire_permission(self.limiter.timeout_duration())
        {
            self.core.emit_next(element);
        } else {
            tracing::debug!(limiter = %self.limiter.name(), "permission denied mid-stream");
            let error = self.denied();
            self.core.abort(error);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if self.core.claim_terminal() {
            self.core.emit_error(error);
        }
    }

    fn on_complete(&mut self) {
        if self.core.claim_terminal() {
            self.core.emit_complete();
        }
    }
}
