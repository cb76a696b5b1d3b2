//! Gate state machine shared by the rate-limiter and bulkhead gates.
//!
//! The admission decision is the one operation that may race with
//! cancellation, so it lives in a tri-state permit cell moved out of
//! `Pending` by a single compare-and-swap: exactly one thread runs the
//! (possibly blocking) policy check, everyone else observes the decided
//! state. All other per-subscription fields are only touched from the
//! substrate's single delivery thread.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use crate::stream::{StreamError, Subscriber, Subscription};

const PENDING: u8 = 0;
const ACQUIRED: u8 = 1;
const REJECTED: u8 = 2;

/// One-shot admission decision for a single subscription.
///
/// The only legal transitions are `Pending -> Acquired` and
/// `Pending -> Rejected`, and at most one of them ever happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Permit {
    Pending,
    Acquired,
    Rejected,
}

impl Permit {
    fn from_raw(raw: u8) -> Self {
        match raw {
            PENDING => Permit::Pending,
            ACQUIRED => Permit::Acquired,
            _ => Permit::Rejected,
        }
    }
}

/// Error delivered downstream when a gate refuses (or revokes) admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The rate limiter refused a permission within its wait budget.
    #[error("request not permitted for rate limiter '{name}'")]
    RateLimitExceeded { name: String },
    /// The bulkhead had no free concurrency slot.
    #[error("bulkhead '{name}' is full")]
    BulkheadFull { name: String },
}

/// Per-subscription state shared between the gate and the subscription
/// handle it hands downstream.
pub(crate) struct GateState {
    permit: AtomicU8,
    cancelled: AtomicBool,
    terminated: AtomicBool,
    upstream: OnceLock<Arc<dyn Subscription>>,
}

impl GateState {
    fn new() -> Self {
        Self {
            permit: AtomicU8::new(PENDING),
            cancelled: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            upstream: OnceLock::new(),
        }
    }

    /// Claim the right to run the policy check. Exactly one caller wins.
    pub(crate) fn try_begin_decision(&self) -> bool {
        self.permit
            .compare_exchange(PENDING, ACQUIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn reject_decision(&self) {
        self.permit.store(REJECTED, Ordering::Release);
    }

    pub(crate) fn permit(&self) -> Permit {
        Permit::from_raw(self.permit.load(Ordering::Acquire))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Idempotent; only the first caller propagates the cancel upstream.
    pub(crate) fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel)
            && let Some(upstream) = self.upstream.get()
        {
            upstream.cancel();
        }
    }

    /// Claim the single terminal signal. Returns `false` once terminated.
    fn try_terminate(&self) -> bool {
        !self.terminated.swap(true, Ordering::AcqRel)
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

/// Subscription handle exposed to the downstream consumer.
///
/// Inert once the gate has been cancelled, which includes the
/// admission-denied path: the consumer still receives a handle there, but
/// it forwards nothing.
struct GateHandle {
    state: Arc<GateState>,
}

impl Subscription for GateHandle {
    fn request(&self, n: u64) {
        if !self.state.is_cancelled()
            && let Some(upstream) = self.state.upstream.get()
        {
            upstream.request(n);
        }
    }

    fn cancel(&self) {
        self.state.cancel();
    }
}

/// Lifecycle skeleton shared by both gates: admission, guarded
/// forwarding, and terminal-signal deduplication.
pub(crate) struct GateCore<T, S: Subscriber<T>> {
    downstream: S,
    state: Arc<GateState>,
    _element: PhantomData<fn(T)>,
}

impl<T, S: Subscriber<T>> GateCore<T, S> {
    pub(crate) fn new(downstream: S) -> Self {
        Self {
            downstream,
            state: Arc::new(GateState::new()),
            _element: PhantomData,
        }
    }

    /// Run the admission decision and deliver `on_subscribe` (plus, on
    /// denial, the single admission error) downstream.
    ///
    /// Only the compare-and-swap winner runs `check`; losing the swap
    /// counts as denial without re-running it.
    pub(crate) fn admit<C, E>(&mut self, upstream: Arc<dyn Subscription>, check: C, denied: E)
    where
        C: FnOnce() -> bool,
        E: FnOnce() -> AdmissionError,
    {
        let _ = self.state.upstream.set(upstream);

        let admitted = if self.state.try_begin_decision() {
            let granted = check();
            if !granted {
                self.state.reject_decision();
            }
            granted
        } else {
            false
        };

        let handle: Arc<dyn Subscription> = Arc::new(GateHandle {
            state: Arc::clone(&self.state),
        });

        if admitted {
            self.downstream.on_subscribe(handle);
        } else {
            // Cancel before handing out the handle so the consumer only
            // ever holds an inert one.
            self.state.cancel();
            self.downstream.on_subscribe(handle);
            self.deny(denied());
        }
    }

    /// True while data signals may still be forwarded.
    pub(crate) fn ready_for_next(&self) -> bool {
        !self.state.is_cancelled()
            && self.state.permit() == Permit::Acquired
            && !self.state.is_terminated()
    }

    pub(crate) fn emit_next(&mut self, element: T) {
        self.downstream.on_next(element);
    }

    /// Claim the terminal signal for an admitted stream. The caller emits
    /// the downstream terminal itself (the bulkhead gate releases its slot
    /// in between).
    pub(crate) fn claim_terminal(&self) -> bool {
        self.state.permit() == Permit::Acquired && self.state.try_terminate()
    }

    pub(crate) fn emit_error(&mut self, error: StreamError) {
        self.downstream.on_error(error);
    }

    pub(crate) fn emit_complete(&mut self) {
        self.downstream.on_complete();
    }

    /// Revoke an in-flight stream: cancel upstream, then deliver the
    /// denial as the single terminal signal.
    pub(crate) fn abort(&mut self, error: AdmissionError) {
        self.state.cancel();
        self.deny(error);
    }

    fn deny(&mut self, error: AdmissionError) {
        if self.state.try_terminate() {
            self.downstream.on_error(error.into());
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &Arc<GateState> {
        &self.state
    }
}
