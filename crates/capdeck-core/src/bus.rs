// ── Notification bus ──
//
// One broadcast channel per notification kind. Emitting with no
// subscribers drops the value; dropping a `Subscription` unsubscribes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

use capdeck_api::{Event, Session};

use crate::error::CoreError;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out publisher for everything the pollers and commands report.
#[derive(Debug)]
pub struct NotificationBus {
    new_session: broadcast::Sender<Arc<Session>>,
    new_events: broadcast::Sender<Arc<Vec<Event>>>,
    logged_in: broadcast::Sender<()>,
    logged_out: broadcast::Sender<Option<CoreError>>,
    session_error: broadcast::Sender<CoreError>,
    command_error: broadcast::Sender<CoreError>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            new_session: broadcast::channel(CHANNEL_CAPACITY).0,
            new_events: broadcast::channel(CHANNEL_CAPACITY).0,
            logged_in: broadcast::channel(CHANNEL_CAPACITY).0,
            logged_out: broadcast::channel(CHANNEL_CAPACITY).0,
            session_error: broadcast::channel(CHANNEL_CAPACITY).0,
            command_error: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    // ── Emission ─────────────────────────────────────────────────

    pub(crate) fn emit_new_session(&self, session: Arc<Session>) {
        emit(&self.new_session, session, "new-session");
    }

    pub(crate) fn emit_new_events(&self, events: Arc<Vec<Event>>) {
        emit(&self.new_events, events, "new-events");
    }

    pub(crate) fn emit_logged_in(&self) {
        emit(&self.logged_in, (), "logged-in");
    }

    /// `None` for an explicit or startup logout, `Some` when the agent
    /// forced it.
    pub(crate) fn emit_logged_out(&self, reason: Option<CoreError>) {
        emit(&self.logged_out, reason, "logged-out");
    }

    pub(crate) fn emit_session_error(&self, err: CoreError) {
        emit(&self.session_error, err, "session-error");
    }

    pub(crate) fn emit_command_error(&self, err: CoreError) {
        emit(&self.command_error, err, "command-error");
    }

    // ── Subscription ─────────────────────────────────────────────

    pub fn new_session(&self) -> Subscription<Arc<Session>> {
        Subscription::new(self.new_session.subscribe())
    }

    pub fn new_events(&self) -> Subscription<Arc<Vec<Event>>> {
        Subscription::new(self.new_events.subscribe())
    }

    pub fn logged_in(&self) -> Subscription<()> {
        Subscription::new(self.logged_in.subscribe())
    }

    pub fn logged_out(&self) -> Subscription<Option<CoreError>> {
        Subscription::new(self.logged_out.subscribe())
    }

    pub fn session_error(&self) -> Subscription<CoreError> {
        Subscription::new(self.session_error.subscribe())
    }

    pub fn command_error(&self) -> Subscription<CoreError> {
        Subscription::new(self.command_error.subscribe())
    }
}

fn emit<T>(tx: &broadcast::Sender<T>, value: T, kind: &'static str) {
    // An error only means nobody is listening.
    if tx.send(value).is_err() {
        trace!(kind, "notification dropped, no subscribers");
    }
}

/// A live subscription to one notification kind.
///
/// Only sees values emitted after it was created. Slow subscribers
/// skip whatever they fell behind on rather than erroring.
pub struct Subscription<T: Clone + Send + 'static> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    fn new(receiver: broadcast::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Wait for the next notification. Returns `None` once the bus has
    /// been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll. `None` if nothing is pending.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> NotificationStream<T> {
        NotificationStream {
            inner: BroadcastStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `broadcast::Receiver`.
pub struct NotificationStream<T: Clone + Send + 'static> {
    inner: BroadcastStream<T>,
}

impl<T: Clone + Send + 'static> Stream for NotificationStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(value)),
                // Lagged: skip ahead.
                Poll::Ready(Some(Err(_))) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let bus = NotificationBus::new();
        let mut a = bus.logged_in();
        let mut b = bus.logged_in();

        bus.emit_logged_in();

        assert_eq!(a.recv().await, Some(()));
        assert_eq!(b.recv().await, Some(()));
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_dropped() {
        let bus = NotificationBus::new();
        bus.emit_session_error(CoreError::Timeout);

        let mut late = bus.session_error();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let bus = NotificationBus::new();
        let mut session_errors = bus.session_error();
        let mut command_errors = bus.command_error();

        bus.emit_command_error(CoreError::NotLoggedIn);

        assert!(session_errors.try_recv().is_none());
        assert_eq!(command_errors.recv().await, Some(CoreError::NotLoggedIn));
    }

    #[tokio::test]
    async fn logged_out_carries_optional_reason() {
        let bus = NotificationBus::new();
        let mut sub = bus.logged_out();

        bus.emit_logged_out(None);
        bus.emit_logged_out(Some(CoreError::Timeout));

        assert_eq!(sub.recv().await, Some(None));
        assert_eq!(sub.recv().await, Some(Some(CoreError::Timeout)));
    }

    #[tokio::test]
    async fn stream_yields_values_and_ends_with_bus() {
        let bus = NotificationBus::new();
        let mut stream = bus.new_events().into_stream();

        bus.emit_new_events(Arc::new(Vec::new()));
        assert!(stream.next().await.unwrap().is_empty());

        drop(bus);
        assert!(stream.next().await.is_none());
    }
}
