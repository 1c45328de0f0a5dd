//! Encoder port: how an event becomes the bytes a subscriber receives.
//!
//! Encoding must be deterministic per event. Decoding is the subscriber's job.

use bytes::Bytes;

use glowhub_domain::event::Event;

/// Failure to encode an event.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to encode event as JSON")]
    Json(#[from] serde_json::Error),
}

/// Serializes events for the broadcast hub.
pub trait EventEncoder: Send + Sync + 'static {
    /// Encode `event` into a self-contained payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the event cannot be represented.
    fn encode(&self, event: &Event) -> Result<Bytes, EncodeError>;
}

/// Encodes events as compact JSON objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl EventEncoder for JsonEncoder {
    fn encode(&self, event: &Event) -> Result<Bytes, EncodeError> {
        Ok(Bytes::from(serde_json::to_vec(event)?))
    }
}

#[cfg(test)]
mod tests {
    use glowhub_domain::device::Device;
    use glowhub_domain::event::EventType;

    use super::*;

    #[test]
    fn should_encode_event_as_json_object() {
        let device = Device::builder().id("KL-01").brightness(30).build().unwrap();
        let event = Event::device(EventType::DeviceUpdated, device);

        let bytes = JsonEncoder.encode(&event).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "device-updated");
        assert_eq!(value["payload"]["data"]["brightness"], 30);
    }

    #[test]
    fn should_encode_same_event_identically() {
        let device = Device::builder().id("KL-01").build().unwrap();
        let event = Event::device(EventType::DeviceDiscovered, device);
        assert_eq!(
            JsonEncoder.encode(&event).unwrap(),
            JsonEncoder.encode(&event).unwrap()
        );
    }
}
