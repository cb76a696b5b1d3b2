//! Bulkhead gate: one concurrency slot per subscription.

use std::sync::Arc;

use crate::gate::core::{AdmissionError, GateCore};
use crate::policy::Bulkhead;
use crate::stream::{StreamError, Subscriber, Subscription};

/// Wraps a downstream subscriber in a bulkhead.
///
/// Admission is checked exactly once, at subscription time; once admitted,
/// elements forward unconditionally. The slot goes back to the bulkhead
/// exactly once, on the first terminal signal (error or completion), and
/// never for a rejected subscription. A downstream cancel does not release
/// the slot by itself; the slot is held until the upstream reports its
/// terminal, so an upstream that never terminates after cancellation pins
/// a slot for good.
pub struct BulkheadSubscriber<T, S: Subscriber<T>> {
    bulkhead: Arc<dyn Bulkhead>,
    core: GateCore<T, S>,
}

impl<T, S: Subscriber<T>> BulkheadSubscriber<T, S> {
    pub fn new(bulkhead: Arc<dyn Bulkhead>, downstream: S) -> Self {
        Self {
            bulkhead,
            core: GateCore::new(downstream),
        }
    }

    /// Return the slot. Only reachable through `claim_terminal`, which
    /// fires at most once per gate, so the bulkhead never sees a double
    /// release.
    fn release_slot(&self) {
        self.bulkhead.on_complete();
        tracing::debug!(bulkhead = %self.bulkhead.name(), "slot released");
    }
}

impl<T, S: Subscriber<T>> Subscriber<T> for BulkheadSubscriber<T, S> {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        let bulkhead = Arc::clone(&self.bulkhead);
        let name = self.bulkhead.name().to_string();
        self.core.admit(
            subscription,
            move || bulkhead.is_call_permitted(),
            move || {
                tracing::debug!(bulkhead = %name, "no free slot at subscribe");
                AdmissionError::BulkheadFull { name }
            },
        );
    }

    fn on_next(&mut self, element: T) {
        if self.core.ready_for_next() {
            self.core.emit_next(element);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if self.core.claim_terminal() {
            self.release_slot();
            self.core.emit_error(error);
        }
    }

    fn on_complete(&mut self) {
        if self.core.claim_terminal() {
            self.release_slot();
            self.core.emit_complete();
        }
    }
}
