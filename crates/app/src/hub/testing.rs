//! In-memory transport for hub tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::ports::{ControlFrame, Transport, TransportError, TransportReceiver, TransportSender};

#[derive(Default)]
struct Flags {
    acknowledge: AtomicBool,
    stalled: AtomicBool,
    failing: AtomicBool,
    closed: AtomicBool,
    keepalives: AtomicUsize,
    send_delay_ms: AtomicU64,
}

/// `None` in the frame channel means the peer hung up.
type Frame = Option<ControlFrame>;

pub(crate) struct MockTransport {
    flags: Arc<Flags>,
    delivered: mpsc::UnboundedSender<Bytes>,
    frames_tx: mpsc::UnboundedSender<Frame>,
    frames_rx: mpsc::UnboundedReceiver<Frame>,
}

impl MockTransport {
    /// A healthy peer that acknowledges every keepalive.
    pub(crate) fn new() -> (Self, MockPeer) {
        let flags = Arc::new(Flags::default());
        flags.acknowledge.store(true, Ordering::Release);
        let (delivered, received) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let peer = MockPeer {
            flags: Arc::clone(&flags),
            received,
            frames: frames_tx.clone(),
        };
        (
            Self {
                flags,
                delivered,
                frames_tx,
                frames_rx,
            },
            peer,
        )
    }

    /// A peer whose every write hangs forever.
    pub(crate) fn stalled() -> (Self, MockPeer) {
        let (transport, peer) = Self::new();
        transport.flags.stalled.store(true, Ordering::Release);
        (transport, peer)
    }

    /// A peer that takes `delay` to accept each event.
    pub(crate) fn slow(delay: Duration) -> (Self, MockPeer) {
        let (transport, peer) = Self::new();
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        transport.flags.send_delay_ms.store(millis, Ordering::Release);
        (transport, peer)
    }
}

impl Transport for MockTransport {
    type Sender = MockSender;
    type Receiver = MockReceiver;

    fn split(self) -> (MockSender, MockReceiver) {
        (
            MockSender {
                flags: Arc::clone(&self.flags),
                delivered: self.delivered,
                frames: self.frames_tx,
            },
            MockReceiver {
                frames: self.frames_rx,
            },
        )
    }
}

pub(crate) struct MockSender {
    flags: Arc<Flags>,
    delivered: mpsc::UnboundedSender<Bytes>,
    frames: mpsc::UnboundedSender<Frame>,
}

impl TransportSender for MockSender {
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        if self.flags.stalled.load(Ordering::Acquire) {
            std::future::pending::<()>().await;
        }
        if self.flags.failing.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let delay = self.flags.send_delay_ms.load(Ordering::Acquire);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.delivered
            .send(payload)
            .map_err(|_| TransportError::Closed)
    }

    async fn keepalive(&mut self) -> Result<(), TransportError> {
        if self.flags.failing.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.flags.keepalives.fetch_add(1, Ordering::AcqRel);
        if self.flags.acknowledge.load(Ordering::Acquire) {
            let _ = self.frames.send(Some(ControlFrame::KeepaliveAck));
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.flags.closed.store(true, Ordering::Release);
    }
}

pub(crate) struct MockReceiver {
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl TransportReceiver for MockReceiver {
    async fn receive(&mut self) -> Result<Option<ControlFrame>, TransportError> {
        Ok(self.frames.recv().await.flatten())
    }
}

/// The test's end of a [`MockTransport`].
pub(crate) struct MockPeer {
    flags: Arc<Flags>,
    received: mpsc::UnboundedReceiver<Bytes>,
    frames: mpsc::UnboundedSender<Frame>,
}

impl MockPeer {
    /// Next delivered event, decoded, waiting up to two seconds.
    pub(crate) async fn next_event(&mut self) -> Option<serde_json::Value> {
        self.next_event_within(Duration::from_secs(2)).await
    }

    pub(crate) async fn next_event_within(&mut self, limit: Duration) -> Option<serde_json::Value> {
        let payload = tokio::time::timeout(limit, self.received.recv())
            .await
            .ok()??;
        serde_json::from_slice(&payload).ok()
    }

    pub(crate) fn stop_acknowledging(&self) {
        self.flags.acknowledge.store(false, Ordering::Release);
    }

    /// Make every later send and keepalive fail.
    pub(crate) fn fail_writes(&self) {
        self.flags.failing.store(true, Ordering::Release);
    }

    pub(crate) fn hang_up(&self) {
        let _ = self.frames.send(None);
    }

    /// Every event delivered so far, decoded, without waiting.
    pub(crate) fn drain_events(&mut self) -> Vec<serde_json::Value> {
        std::iter::from_fn(|| self.received.try_recv().ok())
            .filter_map(|payload| serde_json::from_slice(&payload).ok())
            .collect()
    }

    pub(crate) fn keepalives(&self) -> usize {
        self.flags.keepalives.load(Ordering::Acquire)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.flags.closed.load(Ordering::Acquire)
    }
}

/// Poll `condition` every 5ms for up to two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
