//! Transport port: one persistent subscriber connection.
//!
//! The hub drives the two halves from different tasks: the sender half from
//! the subscriber's writer task, the receiver half from its reader task.

use std::future::Future;

use bytes::Bytes;

use glowhub_domain::error::GlowHubError;

/// Inbound frame read from a subscriber connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// The peer acknowledged a keepalive.
    KeepaliveAck,
    /// Any other data sent by the peer. The hub ignores it.
    Message(Bytes),
}

/// Failure of a subscriber connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("operation timed out")]
    TimedOut,

    #[error("transport I/O error")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<TransportError> for GlowHubError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Outbound half of a connection.
pub trait TransportSender: Send + 'static {
    /// Deliver one encoded event.
    fn send(&mut self, payload: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Send a keepalive the peer is expected to acknowledge.
    fn keepalive(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Tell the peer no more data follows and release the connection.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Inbound half of a connection.
pub trait TransportReceiver: Send + 'static {
    /// Wait for the next control frame. `Ok(None)` means the peer closed.
    fn receive(
        &mut self,
    ) -> impl Future<Output = Result<Option<ControlFrame>, TransportError>> + Send;
}

/// A connection that can be split into independently driven halves.
pub trait Transport: Send + 'static {
    type Sender: TransportSender;
    type Receiver: TransportReceiver;

    fn split(self) -> (Self::Sender, Self::Receiver);
}
