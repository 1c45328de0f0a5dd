//! Event: an immutable record of something that happened.
//!
//! Events are produced when devices are discovered, changed or removed and
//! when groups change. Once published they are shared as `Arc<Event>` and
//! never mutated again.

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::group::Group;
use crate::id::EventId;
use crate::time::{Timestamp, now};

/// Discriminant of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    DeviceDiscovered,
    DeviceUpdated,
    DeviceRemoved,
    GroupUpdated,
    GroupRemoved,
    Custom,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceDiscovered => "device-discovered",
            Self::DeviceUpdated => "device-updated",
            Self::DeviceRemoved => "device-removed",
            Self::GroupUpdated => "group-updated",
            Self::GroupRemoved => "group-removed",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an [`Event`] carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum EventPayload {
    Device(Device),
    Group(Group),
    Data(serde_json::Map<String, serde_json::Value>),
}

/// An immutable record of a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: EventPayload,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            payload,
            timestamp: now(),
        }
    }

    /// Shorthand for an event carrying a device snapshot.
    #[must_use]
    pub fn device(event_type: EventType, device: Device) -> Self {
        Self::new(event_type, EventPayload::Device(device))
    }

    /// Shorthand for an event carrying a group snapshot.
    #[must_use]
    pub fn group(event_type: EventType, group: Group) -> Self {
        Self::new(event_type, EventPayload::Group(group))
    }

    /// The device snapshot, if this event carries one.
    #[must_use]
    pub fn as_device(&self) -> Option<&Device> {
        match &self.payload {
            EventPayload::Device(device) => Some(device),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> Device {
        Device::builder().id("KL-01").brightness(50).build().unwrap()
    }

    #[test]
    fn should_serialize_type_as_kebab_case() {
        let event = Event::device(EventType::DeviceUpdated, light());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "device-updated");
        assert_eq!(json["payload"]["kind"], "device");
        assert_eq!(json["payload"]["data"]["brightness"], 50);
    }

    #[test]
    fn should_expose_device_snapshot() {
        let event = Event::device(EventType::DeviceDiscovered, light());
        assert_eq!(event.as_device().map(|d| d.brightness), Some(50));
    }

    #[test]
    fn should_not_expose_device_for_data_payload() {
        let mut data = serde_json::Map::new();
        data.insert("note".to_string(), serde_json::json!("hello"));
        let event = Event::new(EventType::Custom, EventPayload::Data(data));
        assert!(event.as_device().is_none());
    }

    #[test]
    fn should_display_event_type() {
        assert_eq!(EventType::DeviceRemoved.to_string(), "device-removed");
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let event = Event::device(EventType::DeviceDiscovered, light());
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
