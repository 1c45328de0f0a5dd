//! WebSocket implementation of the hub's transport port.
//!
//! Events go out as text frames (binary if a payload is not UTF-8). Keepalive
//! messages are WebSocket pings; the peer's pongs count as acknowledgments.

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use glowhub_app::ports::{
    ControlFrame, Transport, TransportError, TransportReceiver, TransportSender,
};

/// An upgraded WebSocket ready to be admitted to the hub.
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    #[must_use]
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Transport for WsTransport {
    type Sender = WsSender;
    type Receiver = WsReceiver;

    fn split(self) -> (WsSender, WsReceiver) {
        let (sink, stream) = self.socket.split();
        (WsSender { sink }, WsReceiver { stream })
    }
}

/// Outbound half of a [`WsTransport`].
pub struct WsSender {
    sink: SplitSink<WebSocket, Message>,
}

impl TransportSender for WsSender {
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        self.sink.send(frame(payload)).await.map_err(io_error)
    }

    async fn keepalive(&mut self) -> Result<(), TransportError> {
        self.sink
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(io_error)
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// Inbound half of a [`WsTransport`].
pub struct WsReceiver {
    stream: SplitStream<WebSocket>,
}

impl TransportReceiver for WsReceiver {
    async fn receive(&mut self) -> Result<Option<ControlFrame>, TransportError> {
        loop {
            let frame = match self.stream.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(err)) => return Err(io_error(err)),
                Some(Ok(Message::Pong(_))) => ControlFrame::KeepaliveAck,
                Some(Ok(Message::Text(text))) => {
                    ControlFrame::Message(Bytes::copy_from_slice(text.as_str().as_bytes()))
                }
                Some(Ok(Message::Binary(data))) => ControlFrame::Message(data),
                // axum answers pings itself
                Some(Ok(Message::Ping(_))) => continue,
            };
            return Ok(Some(frame));
        }
    }
}

// cloning `Bytes` only bumps a refcount, so the payload is never copied
fn frame(payload: Bytes) -> Message {
    match Utf8Bytes::try_from(payload.clone()) {
        Ok(text) => Message::Text(text),
        Err(_) => Message::Binary(payload),
    }
}

fn io_error(err: axum::Error) -> TransportError {
    TransportError::Io(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_send_utf8_payload_as_text_frame() {
        let payload = Bytes::from_static(br#"{"type":"device-updated"}"#);

        match frame(payload) {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"type":"device-updated"}"#),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[test]
    fn should_send_invalid_utf8_payload_as_binary_frame() {
        let payload = Bytes::from_static(&[0xff, 0xfe, 0x00]);

        match frame(payload.clone()) {
            Message::Binary(data) => assert_eq!(data, payload),
            other => panic!("expected a binary frame, got {other:?}"),
        }
    }
}
