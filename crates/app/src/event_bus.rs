//! In-process event bus with an explicit sink list.
//!
//! Producers call [`EventBus::publish`]; every registered [`Sink`] is invoked
//! synchronously, in registration order, with the same shared `Arc<Event>`.
//! The sink list lock is only held to copy the list, never while a sink runs,
//! so subscribing or unsubscribing from anywhere (including a sink) is safe.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::mpsc;

use glowhub_domain::event::Event;

use crate::hub::HubSink;
use crate::ports::EncodeError;

/// Failure of a single sink while handling an event.
///
/// Logged by the bus; never reaches the publisher or other sinks.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to encode event")]
    Encode(#[from] EncodeError),

    #[error("sink queue is full")]
    Backlogged,

    #[error("sink receiver is gone")]
    Disconnected,
}

/// A consumer of bus events.
pub enum Sink {
    /// Feeds the broadcast hub's distribution channel.
    Hub(HubSink),
    /// Writes every event to the `tracing` log.
    Log(LogSink),
    /// Forwards events into an unbounded channel.
    Channel(ChannelSink),
}

impl Sink {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the sink could not accept the event.
    pub fn handle(&self, event: &Arc<Event>) -> Result<(), SinkError> {
        match self {
            Self::Hub(sink) => sink.handle(event),
            Self::Log(sink) => {
                sink.handle(event);
                Ok(())
            }
            Self::Channel(sink) => sink.handle(event),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hub(_) => "hub",
            Self::Log(_) => "log",
            Self::Channel(_) => "channel",
        }
    }
}

/// Logs every event at `DEBUG`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    #[allow(clippy::unused_self)]
    fn handle(self, event: &Event) {
        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            device_id = event.as_device().map(|device| device.id.as_str()),
            "bus event"
        );
    }
}

/// Forwards events into an unbounded channel owned by the caller.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Arc<Event>>,
}

impl ChannelSink {
    /// Create the sink together with the receiving end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Arc<Event>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn handle(&self, event: &Arc<Event>) -> Result<(), SinkError> {
        self.sender
            .send(Arc::clone(event))
            .map_err(|_| SinkError::Disconnected)
    }
}

struct Registered {
    id: u64,
    sink: Arc<Sink>,
}

#[derive(Default)]
struct BusInner {
    sinks: RwLock<Vec<Registered>>,
    next_id: AtomicU64,
}

/// Publish/subscribe mediator shared by every producer and consumer.
///
/// Cloning is cheap; clones share the same sink list.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. It receives every event published after this call.
    #[must_use = "dropping the subscription leaves no way to unsubscribe"]
    pub fn subscribe(&self, sink: Sink) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = sink.kind();
        self.inner
            .sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registered {
                id,
                sink: Arc::new(sink),
            });
        tracing::debug!(sink_id = id, kind, "sink subscribed");
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `event` to every current sink.
    ///
    /// Returns how many sinks accepted it. Failing sinks are logged and skipped.
    pub fn publish(&self, event: Event) -> usize {
        let event = Arc::new(event);
        let snapshot: Vec<(u64, Arc<Sink>)> = self
            .inner
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|registered| (registered.id, Arc::clone(&registered.sink)))
            .collect();

        let mut delivered = 0;
        for (sink_id, sink) in snapshot {
            match sink.handle(&event) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    %err,
                    sink_id,
                    kind = sink.kind(),
                    event_id = %event.id,
                    "event sink failed"
                ),
            }
        }
        delivered
    }

    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.inner
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Handle returned by [`EventBus::subscribe`].
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the sink from the bus. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.bus.upgrade() {
            inner
                .sinks
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|registered| registered.id != self.id);
            tracing::debug!(sink_id = self.id, "sink unsubscribed");
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
