//! Push-based stream protocol: the subscriber and subscription contracts
//! the gates sit on.

use std::sync::Arc;

/// Boxed error delivered through [`Subscriber::on_error`].
pub type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// Handle to an active subscription, given to the downstream consumer so
/// it can control flow and abort delivery.
///
/// Implementations must tolerate calls from any thread, including calls
/// racing against signal delivery.
pub trait Subscription: Send + Sync {
    /// Ask the producer for `n` more elements.
    fn request(&self, n: u64);

    /// Stop the stream. Idempotent; signals already in flight may still be
    /// dropped by an operator between upstream and downstream.
    fn cancel(&self);
}

/// Receiver half of a push-based stream.
///
/// The substrate delivers `on_next`, `on_error` and `on_complete` one at a
/// time from a single thread, delivers at most one terminal signal
/// (`on_error` or `on_complete`), and never delivers anything before
/// `on_subscribe`. [`Subscription::cancel`] may still arrive concurrently
/// from another thread.
pub trait Subscriber<T>: Send {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>);
    fn on_next(&mut self, element: T);
    fn on_error(&mut self, error: StreamError);
    fn on_complete(&mut self);
}
