//! Shared test doubles: a recording subscriber, a stub upstream
//! subscription, and scripted admission policies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::policy::{Bulkhead, RateLimiter};
use crate::stream::{StreamError, Subscriber, Subscription};

/// Downstream signal as observed by [`RecordingSubscriber`]. Errors are
/// recorded by display message; the boxed originals stay available through
/// [`SignalLog::errors`] for downcasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal<T> {
    Subscribed,
    Next(T),
    Error(String),
    Complete,
}

pub(crate) struct SignalLog<T> {
    signals: Arc<Mutex<Vec<Signal<T>>>>,
    errors: Arc<Mutex<Vec<StreamError>>>,
    subscription: Arc<Mutex<Option<Arc<dyn Subscription>>>>,
}

impl<T> Clone for SignalLog<T> {
    fn clone(&self) -> Self {
        Self {
            signals: Arc::clone(&self.signals),
            errors: Arc::clone(&self.errors),
            subscription: Arc::clone(&self.subscription),
        }
    }
}

impl<T> SignalLog<T> {
    pub(crate) fn signals(&self) -> Vec<Signal<T>>
    where
        T: Clone,
    {
        self.signals.lock().unwrap().clone()
    }

    pub(crate) fn errors(&self) -> MutexGuard<'_, Vec<StreamError>> {
        self.errors.lock().unwrap()
    }

    pub(crate) fn subscription(&self) -> Option<Arc<dyn Subscription>> {
        self.subscription.lock().unwrap().clone()
    }
}

/// Downstream consumer that records every signal it receives.
pub(crate) struct RecordingSubscriber<T> {
    log: SignalLog<T>,
}

impl<T> RecordingSubscriber<T> {
    pub(crate) fn new() -> (Self, SignalLog<T>) {
        let log = SignalLog {
            signals: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            subscription: Arc::new(Mutex::new(None)),
        };
        (Self { log: log.clone() }, log)
    }
}

impl<T: Send> Subscriber<T> for RecordingSubscriber<T> {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        *self.log.subscription.lock().unwrap() = Some(subscription);
        self.log.signals.lock().unwrap().push(Signal::Subscribed);
    }

    fn on_next(&mut self, element: T) {
        self.log.signals.lock().unwrap().push(Signal::Next(element));
    }

    fn on_error(&mut self, error: StreamError) {
        self.log
            .signals
            .lock()
            .unwrap()
            .push(Signal::Error(error.to_string()));
        self.log.errors.lock().unwrap().push(error);
    }

    fn on_complete(&mut self) {
        self.log.signals.lock().unwrap().push(Signal::Complete);
    }
}

/// Upstream subscription that records requests and cancels.
#[derive(Default)]
pub(crate) struct StubSubscription {
    requested: Mutex<Vec<u64>>,
    cancels: AtomicUsize,
}

impl StubSubscription {
    pub(crate) fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel_count() > 0
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::Acquire)
    }
}

impl Subscription for StubSubscription {
    fn request(&self, n: u64) {
        self.requested.lock().unwrap().push(n);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::AcqRel);
    }
}

/// Rate limiter answering from a fixed script; anything past the script is
/// denied.
pub(crate) struct ScriptedLimiter {
    name: String,
    responses: Mutex<VecDeque<bool>>,
    attempts: AtomicUsize,
}

impl ScriptedLimiter {
    pub(crate) fn new(name: &str, responses: impl IntoIterator<Item = bool>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            responses: Mutex::new(responses.into_iter().collect()),
            attempts: AtomicUsize::new(0),
        })
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }
}

impl RateLimiter for ScriptedLimiter {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout_duration(&self) -> Duration {
        Duration::from_millis(25)
    }

    fn try_acquire_permission(&self, _timeout: Duration) -> bool {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        self.responses.lock().unwrap().pop_front().unwrap_or(false)
    }
}

/// Bulkhead backed by a real slot counter, with acquire/release tallies.
pub(crate) struct CountingBulkhead {
    name: String,
    free: AtomicIsize,
    acquire_attempts: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingBulkhead {
    pub(crate) fn with_slots(name: &str, slots: isize) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            free: AtomicIsize::new(slots),
            acquire_attempts: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        })
    }

    pub(crate) fn acquire_attempts(&self) -> usize {
        self.acquire_attempts.load(Ordering::Acquire)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }

    pub(crate) fn free_slots(&self) -> isize {
        self.free.load(Ordering::Acquire)
    }
}

impl Bulkhead for CountingBulkhead {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_call_permitted(&self) -> bool {
        self.acquire_attempts.fetch_add(1, Ordering::AcqRel);
        let mut free = self.free.load(Ordering::Acquire);
        while free > 0 {
            match self.free.compare_exchange(
                free,
                free - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => free = actual,
            }
        }
        false
    }

    fn on_complete(&self) {
        self.releases.fetch_add(1, Ordering::AcqRel);
        self.free.fetch_add(1, Ordering::AcqRel);
    }
}
