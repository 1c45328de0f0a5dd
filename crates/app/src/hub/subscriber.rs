//! Per-subscriber tasks.
//!
//! Both tasks wait on the admission gate, which the core loop opens once the
//! subscriber is in the active set. If the gate is dropped unopened the hub is
//! gone and the tasks only close the transport.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use glowhub_domain::id::SubscriberId;

use super::{EvictReason, HubCommand};
use crate::ports::{ControlFrame, TransportError, TransportReceiver, TransportSender};

pub(super) struct WriterContext {
    pub id: SubscriberId,
    pub outbox: mpsc::Receiver<Bytes>,
    pub evict: Arc<Notify>,
    pub gate: watch::Receiver<bool>,
    pub control: mpsc::UnboundedSender<HubCommand>,
    pub keepalive_interval: Duration,
    pub write_timeout: Duration,
}

pub(super) struct ReaderContext {
    pub id: SubscriberId,
    pub gate: watch::Receiver<bool>,
    pub control: mpsc::UnboundedSender<HubCommand>,
    pub keepalive_timeout: Duration,
}

enum WriterExit {
    /// Outbox closed and fully flushed.
    Drained,
    Evicted,
    Failed(TransportError),
}

enum Step {
    Deliver(Bytes),
    Keepalive,
}

/// Drain the outbox into the transport, probing the peer every interval.
pub(super) async fn run_writer<S: TransportSender>(mut sender: S, mut ctx: WriterContext) {
    if ctx.gate.wait_for(|open| *open).await.is_err() {
        close(&mut sender, ctx.write_timeout).await;
        return;
    }

    match pump(&mut sender, &mut ctx).await {
        WriterExit::Drained => tracing::debug!(subscriber_id = %ctx.id, "outbox drained"),
        WriterExit::Evicted => tracing::debug!(subscriber_id = %ctx.id, "writer evicted"),
        WriterExit::Failed(err) => {
            tracing::debug!(subscriber_id = %ctx.id, %err, "write failed");
            let _ = ctx.control.send(HubCommand::Remove {
                id: ctx.id,
                reason: EvictReason::WriteFailed,
            });
        }
    }
    close(&mut sender, ctx.write_timeout).await;
}

async fn pump<S: TransportSender>(sender: &mut S, ctx: &mut WriterContext) -> WriterExit {
    let period = ctx.keepalive_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let step = tokio::select! {
            biased;
            () = ctx.evict.notified() => return WriterExit::Evicted,
            item = ctx.outbox.recv() => match item {
                Some(payload) => Step::Deliver(payload),
                None => return WriterExit::Drained,
            },
            _ = ticker.tick() => Step::Keepalive,
        };

        // an eviction must interrupt a write stuck on a stalled peer
        let outcome = tokio::select! {
            biased;
            () = ctx.evict.notified() => return WriterExit::Evicted,
            outcome = tokio::time::timeout(ctx.write_timeout, write(sender, step)) => outcome,
        };
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return WriterExit::Failed(err),
            Err(_) => return WriterExit::Failed(TransportError::TimedOut),
        }
    }
}

async fn write<S: TransportSender>(sender: &mut S, step: Step) -> Result<(), TransportError> {
    match step {
        Step::Deliver(payload) => sender.send(payload).await,
        Step::Keepalive => sender.keepalive().await,
    }
}

async fn close<S: TransportSender>(sender: &mut S, limit: Duration) {
    if tokio::time::timeout(limit, sender.close()).await.is_err() {
        tracing::debug!("transport close timed out");
    }
}

/// Watch for acknowledgments and report why the subscriber went away.
pub(super) async fn run_reader<R: TransportReceiver>(mut receiver: R, mut ctx: ReaderContext) {
    if ctx.gate.wait_for(|open| *open).await.is_err() {
        return;
    }

    let reason = watch_liveness(&mut receiver, ctx.keepalive_timeout).await;
    let _ = ctx.control.send(HubCommand::Remove { id: ctx.id, reason });
}

async fn watch_liveness<R: TransportReceiver>(receiver: &mut R, timeout: Duration) -> EvictReason {
    let mut deadline = Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, receiver.receive()).await {
            Ok(Ok(Some(ControlFrame::KeepaliveAck))) => deadline = Instant::now() + timeout,
            Ok(Ok(Some(ControlFrame::Message(_)))) => {}
            Ok(Ok(None)) => return EvictReason::PeerClosed,
            Ok(Err(err)) => {
                tracing::debug!(%err, "subscriber read failed");
                return EvictReason::PeerClosed;
            }
            Err(_) => return EvictReason::KeepaliveTimeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::MockTransport;
    use super::*;
    use crate::ports::Transport;

    #[tokio::test]
    async fn should_time_out_without_acknowledgments() {
        let (transport, peer) = MockTransport::new();
        peer.stop_acknowledging();
        let (_sender, mut receiver) = transport.split();

        let reason = watch_liveness(&mut receiver, Duration::from_millis(30)).await;

        assert_eq!(reason, EvictReason::KeepaliveTimeout);
    }

    #[tokio::test]
    async fn should_report_peer_closed() {
        let (transport, peer) = MockTransport::new();
        let (_sender, mut receiver) = transport.split();
        peer.hang_up();

        let reason = watch_liveness(&mut receiver, Duration::from_secs(5)).await;

        assert_eq!(reason, EvictReason::PeerClosed);
    }

    #[tokio::test]
    async fn should_close_transport_when_gate_dropped() {
        let (transport, peer) = MockTransport::new();
        let (sender, _receiver) = transport.split();
        let (gate, opened) = watch::channel(false);
        let (control, _commands) = mpsc::unbounded_channel();
        let (_outbox, queue) = mpsc::channel(1);
        drop(gate);

        run_writer(
            sender,
            WriterContext {
                id: SubscriberId::new(),
                outbox: queue,
                evict: Arc::new(Notify::new()),
                gate: opened,
                control,
                keepalive_interval: Duration::from_secs(60),
                write_timeout: Duration::from_secs(1),
            },
        )
        .await;

        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn should_report_write_failure_to_core_loop() {
        let (transport, peer) = MockTransport::new();
        let (sender, _receiver) = transport.split();
        let (gate, opened) = watch::channel(true);
        let (control, mut commands) = mpsc::unbounded_channel();
        let (outbox, queue) = mpsc::channel(1);
        let id = SubscriberId::new();
        peer.fail_writes();
        outbox.send(Bytes::from_static(b"{}")).await.unwrap();

        run_writer(
            sender,
            WriterContext {
                id,
                outbox: queue,
                evict: Arc::new(Notify::new()),
                gate: opened,
                control,
                keepalive_interval: Duration::from_secs(60),
                write_timeout: Duration::from_secs(1),
            },
        )
        .await;
        drop(gate);

        match commands.recv().await {
            Some(HubCommand::Remove { id: removed, reason }) => {
                assert_eq!(removed, id);
                assert_eq!(reason, EvictReason::WriteFailed);
            }
            _ => panic!("expected a removal request"),
        }
        assert!(peer.is_closed());
    }
}
