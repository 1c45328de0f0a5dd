//! Broadcast hub: fans every bus event out to persistent subscribers.
//!
//! A [`HubSink`] encodes each event once and pushes the bytes into a bounded
//! distribution channel. A single core loop owns the subscriber set: it copies
//! each payload into every subscriber's bounded outbox with a non-blocking
//! `try_send`, and processes admissions and removals from a control channel.
//!
//! Each subscriber gets two tasks (see [`subscriber`]): a writer that drains
//! its outbox and sends keepalives, and a reader that waits for
//! acknowledgments. A subscriber whose outbox is full is evicted rather than
//! waited for, so one slow peer never delays the others.
//!
//! ```text
//! EventBus ─► HubSink ─► distribution ─► core loop ─┬─► outbox ─► writer ─► transport
//!                                                   └─► outbox ─► writer ─► transport
//!                              control ◄── readers / writers / remove()
//! ```

mod subscriber;
#[cfg(test)]
mod testing;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};

use glowhub_domain::error::GlowHubError;
use glowhub_domain::event::Event;
use glowhub_domain::id::SubscriberId;

use crate::event_bus::{EventBus, Sink, SinkError, Subscription};
use crate::lifecycle::ShutdownSignal;
use crate::ports::{EventEncoder, Transport, TransportError, TransportSender};

/// Tuning knobs of the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Payloads buffered per subscriber before it counts as stalled.
    pub outbox_capacity: usize,
    /// Payloads buffered between the bus and the core loop.
    pub distribution_capacity: usize,
    /// Period of keepalives.
    pub keepalive_interval: Duration,
    /// How long a subscriber may go without acknowledging a keepalive.
    pub keepalive_timeout: Duration,
    /// Upper bound for a single transport write.
    pub write_timeout: Duration,
    /// How long shutdown waits for writers to flush.
    pub drain_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 256,
            distribution_capacity: 1024,
            keepalive_interval: Duration::from_secs(54),
            keepalive_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Shortest timer period the hub runs with; tokio rejects zero periods.
    const MIN_PERIOD: Duration = Duration::from_millis(1);

    fn normalized(self) -> Self {
        Self {
            outbox_capacity: self.outbox_capacity.max(1),
            distribution_capacity: self.distribution_capacity.max(1),
            keepalive_interval: self.keepalive_interval.max(Self::MIN_PERIOD),
            write_timeout: self.write_timeout.max(Self::MIN_PERIOD),
            ..self
        }
    }
}

/// Why a subscriber left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// Its outbox was full when an event arrived.
    Overrun,
    /// No keepalive acknowledgment before the deadline.
    KeepaliveTimeout,
    /// A write or keepalive failed or timed out.
    WriteFailed,
    /// The peer closed the connection.
    PeerClosed,
    /// [`BroadcastHub::remove`] was called.
    Requested,
}

impl EvictReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overrun => "overrun",
            Self::KeepaliveTimeout => "keepalive_timeout",
            Self::WriteFailed => "write_failed",
            Self::PeerClosed => "peer_closed",
            Self::Requested => "requested",
        }
    }
}

impl fmt::Display for EvictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Admitted,
    Active,
    /// Flushing its outbox before closing.
    Draining,
    /// Fell behind and is being torn down without flushing.
    Stalled,
    Closed,
}

impl fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admitted => "admitted",
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Stalled => "stalled",
            Self::Closed => "closed",
        })
    }
}

/// Bus sink feeding the hub's distribution channel.
pub struct HubSink {
    encoder: Arc<dyn EventEncoder>,
    distribution: mpsc::Sender<Bytes>,
}

impl HubSink {
    pub(crate) fn handle(&self, event: &Event) -> Result<(), SinkError> {
        let payload = self.encoder.encode(event)?;
        self.distribution
            .try_send(payload)
            .map_err(|err| match err {
                TrySendError::Full(_) => SinkError::Backlogged,
                TrySendError::Closed(_) => SinkError::Disconnected,
            })
    }
}

type Outboxes = HashMap<SubscriberId, mpsc::Sender<Bytes>>;

enum HubCommand {
    Admit(Admission),
    Remove {
        id: SubscriberId,
        reason: EvictReason,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

struct Admission {
    id: SubscriberId,
    outbox: mpsc::Sender<Bytes>,
    evict: Arc<Notify>,
    gate: watch::Sender<bool>,
    writer: JoinHandle<()>,
    reader: AbortHandle,
    ack: oneshot::Sender<()>,
}

struct Shared {
    /// Copy-on-write view of the active outboxes. Only the core loop swaps it.
    active: RwLock<Arc<Outboxes>>,
    closed: AtomicBool,
}

impl Shared {
    fn snapshot(&self) -> Arc<Outboxes> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace(&self, outboxes: Outboxes) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(outboxes);
    }
}

struct HubInner {
    control: mpsc::UnboundedSender<HubCommand>,
    shared: Arc<Shared>,
    config: HubConfig,
}

/// Handle to the running hub. Cloning is cheap.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// Subscribe to `bus` and spawn the core loop.
    ///
    /// The hub shuts itself down when `shutdown` fires. Must be called from
    /// within a tokio runtime. Zero capacities and periods are raised to
    /// their smallest usable value.
    pub fn start(
        bus: &EventBus,
        encoder: impl EventEncoder,
        config: HubConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        let config = config.normalized();
        let (distribution, events) = mpsc::channel(config.distribution_capacity);
        let (control, commands) = mpsc::unbounded_channel();
        let subscription = bus.subscribe(Sink::Hub(HubSink {
            encoder: Arc::new(encoder),
            distribution,
        }));
        let shared = Arc::new(Shared {
            active: RwLock::new(Arc::new(HashMap::new())),
            closed: AtomicBool::new(false),
        });

        let core = HubCore {
            shared: Arc::clone(&shared),
            entries: HashMap::new(),
            closing: Vec::new(),
            subscription,
            control: control.clone(),
            drain_timeout: config.drain_timeout,
        };
        tokio::spawn(core.run(events, commands, shutdown));
        tracing::debug!(?config, "broadcast hub started");

        Self {
            inner: Arc::new(HubInner {
                control,
                shared,
                config,
            }),
        }
    }

    /// Take over `transport` and start delivering events to it.
    ///
    /// One keepalive is sent before anything is spawned. Returns once
    /// the subscriber is active.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Transport`] if that keepalive fails or times
    /// out, and [`GlowHubError::ShutDown`] if the hub is shut down. The
    /// transport is closed in both cases.
    pub async fn admit<T: Transport>(&self, transport: T) -> Result<SubscriberId, GlowHubError> {
        let (mut sender, receiver) = transport.split();
        let write_timeout = self.inner.config.write_timeout;
        let reachable = tokio::time::timeout(write_timeout, sender.keepalive())
            .await
            .unwrap_or(Err(TransportError::TimedOut));
        if let Err(err) = reachable {
            tracing::debug!(%err, "transport unusable, refusing subscriber");
            let _ = tokio::time::timeout(write_timeout, sender.close()).await;
            return Err(err.into());
        }

        let id = SubscriberId::new();
        let (outbox, queue) = mpsc::channel(self.inner.config.outbox_capacity);
        let evict = Arc::new(Notify::new());
        let (gate, opened) = watch::channel(false);
        tracing::debug!(subscriber_id = %id, state = %SubscriberState::Admitted, "subscriber admitted");

        let writer = tokio::spawn(subscriber::run_writer(
            sender,
            subscriber::WriterContext {
                id,
                outbox: queue,
                evict: Arc::clone(&evict),
                gate: opened.clone(),
                control: self.inner.control.clone(),
                keepalive_interval: self.inner.config.keepalive_interval,
                write_timeout: self.inner.config.write_timeout,
            },
        ));
        let reader = tokio::spawn(subscriber::run_reader(
            receiver,
            subscriber::ReaderContext {
                id,
                gate: opened,
                control: self.inner.control.clone(),
                keepalive_timeout: self.inner.config.keepalive_timeout,
            },
        ));

        if self.inner.shared.closed.load(Ordering::Acquire) {
            // dropping the gate makes both tasks close the transport and exit
            return Err(GlowHubError::ShutDown);
        }

        let (ack, admitted) = oneshot::channel();
        let command = HubCommand::Admit(Admission {
            id,
            outbox,
            evict,
            gate,
            writer,
            reader: reader.abort_handle(),
            ack,
        });
        if self.inner.control.send(command).is_err() {
            return Err(GlowHubError::ShutDown);
        }
        admitted.await.map_err(|_| GlowHubError::ShutDown)?;
        Ok(id)
    }

    /// Ask the core loop to drain and close one subscriber.
    ///
    /// Unknown or already removed ids are ignored.
    pub fn remove(&self, id: SubscriberId) {
        let _ = self.inner.control.send(HubCommand::Remove {
            id,
            reason: EvictReason::Requested,
        });
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.shared.snapshot().len()
    }

    #[must_use]
    pub fn is_active(&self, id: SubscriberId) -> bool {
        self.inner.shared.snapshot().contains_key(&id)
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shared.closed.load(Ordering::Acquire)
    }

    /// Drain and close every subscriber, then stop the core loop.
    ///
    /// Safe to call concurrently and repeatedly; every call returns once the
    /// hub is fully stopped.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self
            .inner
            .control
            .send(HubCommand::Shutdown { ack })
            .is_err()
        {
            return;
        }
        // the ack is dropped, not sent, when another caller got there first
        let _ = done.await;
    }
}

struct Entry {
    state: SubscriberState,
    evict: Arc<Notify>,
    writer: JoinHandle<()>,
    reader: AbortHandle,
}

struct HubCore {
    shared: Arc<Shared>,
    entries: HashMap<SubscriberId, Entry>,
    /// Writers still flushing or closing after leaving the active set.
    closing: Vec<JoinHandle<()>>,
    subscription: Subscription,
    control: mpsc::UnboundedSender<HubCommand>,
    drain_timeout: Duration,
}

impl HubCore {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<Bytes>,
        mut commands: mpsc::UnboundedReceiver<HubCommand>,
        mut shutdown: ShutdownSignal,
    ) {
        let ack = loop {
            tokio::select! {
                biased;
                () = shutdown.wait() => break None,
                Some(command) = commands.recv() => match command {
                    HubCommand::Admit(admission) => self.admit(admission),
                    HubCommand::Remove { id, reason } => self.remove(id, reason),
                    HubCommand::Shutdown { ack } => break Some(ack),
                },
                Some(payload) = events.recv() => self.fan_out(&payload),
            }
        };

        self.drain().await;
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        tracing::info!("broadcast hub stopped");
    }

    fn admit(&mut self, admission: Admission) {
        let Admission {
            id,
            outbox,
            evict,
            gate,
            writer,
            reader,
            ack,
        } = admission;

        let mut outboxes = Outboxes::clone(&self.shared.snapshot());
        outboxes.insert(id, outbox);
        self.shared.replace(outboxes);
        self.entries.insert(
            id,
            Entry {
                state: SubscriberState::Active,
                evict,
                writer,
                reader,
            },
        );
        gate.send_replace(true);
        tracing::info!(
            subscriber_id = %id,
            state = %SubscriberState::Active,
            subscribers = self.entries.len(),
            "subscriber active"
        );

        if ack.send(()).is_err() {
            // the caller gave up waiting
            self.remove(id, EvictReason::Requested);
        }
    }

    fn fan_out(&self, payload: &Bytes) {
        let outboxes = self.shared.snapshot();
        for (id, outbox) in outboxes.iter() {
            let reason = match outbox.try_send(payload.clone()) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => EvictReason::Overrun,
                Err(TrySendError::Closed(_)) => EvictReason::WriteFailed,
            };
            let _ = self.control.send(HubCommand::Remove { id: *id, reason });
        }
    }

    fn remove(&mut self, id: SubscriberId, reason: EvictReason) {
        let Some(mut entry) = self.entries.remove(&id) else {
            return;
        };

        let mut outboxes = Outboxes::clone(&self.shared.snapshot());
        outboxes.remove(&id);
        self.shared.replace(outboxes);

        let next = match reason {
            EvictReason::Requested => SubscriberState::Draining,
            EvictReason::Overrun => SubscriberState::Stalled,
            _ => SubscriberState::Closed,
        };
        tracing::debug!(subscriber_id = %id, from = %entry.state, to = %next, "subscriber state");
        entry.state = next;

        if next != SubscriberState::Draining {
            entry.evict.notify_one();
        }
        entry.reader.abort();
        self.closing.retain(|writer| !writer.is_finished());
        self.closing.push(entry.writer);

        if reason == EvictReason::Requested {
            tracing::info!(subscriber_id = %id, %reason, "subscriber removed");
        } else {
            tracing::warn!(subscriber_id = %id, %reason, "subscriber evicted");
        }
    }

    async fn drain(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.subscription.unsubscribe();
        // dropping the outbox senders lets every writer flush and close
        self.shared.replace(HashMap::new());

        for (id, entry) in self.entries.drain() {
            tracing::debug!(subscriber_id = %id, from = %entry.state, to = %SubscriberState::Draining, "subscriber state");
            entry.reader.abort();
            self.closing.push(entry.writer);
        }

        let mut pending = std::mem::take(&mut self.closing);
        let flushed = tokio::time::timeout(self.drain_timeout, async {
            for writer in &mut pending {
                let _ = writer.await;
            }
        })
        .await;
        if flushed.is_err() {
            tracing::warn!(timeout = ?self.drain_timeout, "drain timed out, aborting writers");
        }
        for writer in pending {
            writer.abort();
        }
    }
}
