//! # glowhub-adapter-virtual
//!
//! Virtual/demo discovery that reports simulated key lights.
//!
//! ## Provided devices
//!
//! | Serial | Name | Product |
//! |--------|------|---------|
//! | `VKL-0001` | Key Light Left | Key Light |
//! | `VKL-0002` | Key Light Right | Key Light |
//! | `VKA-0003` | Desk Light | Key Light Air |
//!
//! Each light answers every discovery pass with its current state. When built
//! with [`VirtualDiscovery::mirroring`], the lights follow `device-updated`
//! events from the bus the way real hardware keeps the last command it got,
//! so a later discovery pass does not revert changes made through the API.
//!
//! ## Dependency rule
//!
//! Depends on `glowhub-app` (port traits, event bus) and `glowhub-domain` only.

mod light;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use glowhub_app::event_bus::{ChannelSink, EventBus, Sink, Subscription};
use glowhub_app::ports::Discovery;
use glowhub_domain::device::Device;
use glowhub_domain::error::GlowHubError;
use glowhub_domain::event::{Event, EventType};

pub use light::VirtualLight;

struct Mirror {
    events: UnboundedReceiver<Arc<Event>>,
    subscription: Subscription,
}

/// Discovery returning a fixed set of simulated lights.
pub struct VirtualDiscovery {
    lights: Vec<VirtualLight>,
    mirror: Option<Mirror>,
}

impl Default for VirtualDiscovery {
    fn default() -> Self {
        Self {
            lights: vec![
                VirtualLight::new("VKL-0001", "Key Light Left", "Key Light", "192.168.1.41"),
                VirtualLight::new("VKL-0002", "Key Light Right", "Key Light", "192.168.1.42"),
                VirtualLight::new("VKA-0003", "Desk Light", "Key Light Air", "192.168.1.43"),
            ],
            mirror: None,
        }
    }
}

impl VirtualDiscovery {
    /// Default lights that track `device-updated` events published on `bus`.
    #[must_use]
    pub fn mirroring(bus: &EventBus) -> Self {
        let (sink, events) = ChannelSink::new();
        let subscription = bus.subscribe(Sink::Channel(sink));
        Self {
            mirror: Some(Mirror {
                events,
                subscription,
            }),
            ..Self::default()
        }
    }

    /// Simulate a light being unplugged or plugged back in.
    ///
    /// Returns `false` if no light has that serial.
    pub fn set_online(&mut self, serial: &str, online: bool) -> bool {
        match self.lights.iter_mut().find(|light| light.serial() == serial) {
            Some(light) => {
                light.set_online(online);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn lights(&self) -> &[VirtualLight] {
        &self.lights
    }

    fn apply_mirrored_updates(&mut self) {
        let Some(mirror) = self.mirror.as_mut() else {
            return;
        };
        while let Ok(event) = mirror.events.try_recv() {
            if event.event_type != EventType::DeviceUpdated {
                continue;
            }
            let Some(device) = event.as_device() else {
                continue;
            };
            if let Some(light) = self
                .lights
                .iter_mut()
                .find(|light| light.serial() == device.id.as_str())
            {
                light.follow(device);
            }
        }
    }
}

impl Drop for Mirror {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl Discovery for VirtualDiscovery {
    fn name(&self) -> &'static str {
        "virtual"
    }

    async fn discover(&mut self) -> Result<Vec<Device>, GlowHubError> {
        self.apply_mirrored_updates();
        let mut found = Vec::with_capacity(self.lights.len());
        for light in self.lights.iter().filter(|light| light.is_online()) {
            found.push(light.describe()?);
        }
        tracing::trace!(count = found.len(), "virtual lights answered");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glowhub_app::discovery::DiscoveryRunner;
    use glowhub_app::registry::DeviceRegistry;
    use glowhub_domain::id::DeviceId;
    use glowhub_domain::property::{Property, PropertyValue};

    use super::*;

    #[tokio::test]
    async fn should_discover_three_lights() {
        let mut discovery = VirtualDiscovery::default();
        let devices = discovery.discover().await.unwrap();
        assert_eq!(devices.len(), 3);
    }

    #[tokio::test]
    async fn should_return_virtual_as_name() {
        let discovery = VirtualDiscovery::default();
        assert_eq!(discovery.name(), "virtual");
    }

    #[tokio::test]
    async fn should_report_product_and_firmware() {
        let mut discovery = VirtualDiscovery::default();
        let devices = discovery.discover().await.unwrap();

        let air = devices
            .iter()
            .find(|device| device.id.as_str() == "VKA-0003")
            .unwrap();
        assert_eq!(air.name, "Desk Light");
        assert_eq!(air.product.as_deref(), Some("Key Light Air"));
        assert!(air.firmware.is_some());
        assert_eq!(air.port, 9123);
    }

    #[tokio::test]
    async fn should_hide_offline_lights() {
        let mut discovery = VirtualDiscovery::default();
        assert!(discovery.set_online("VKL-0002", false));
        assert!(!discovery.set_online("nope", false));

        let devices = discovery.discover().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|device| device.id.as_str() != "VKL-0002"));
    }

    #[tokio::test]
    async fn should_keep_api_changes_across_discovery_passes() {
        let bus = EventBus::new();
        let registry = DeviceRegistry::new(bus.clone());
        let mut runner = DiscoveryRunner::new(
            VirtualDiscovery::mirroring(&bus),
            registry.clone(),
            Duration::from_secs(15),
        );
        runner.run_once().await.unwrap();

        let id = DeviceId::new("VKL-0001");
        registry
            .set_property(&id, Property::Brightness, PropertyValue::Int(35))
            .unwrap();
        runner.run_once().await.unwrap();

        assert_eq!(registry.get(&id).unwrap().brightness, 35);
    }

    #[test]
    fn should_unsubscribe_when_dropped() {
        let bus = EventBus::new();
        let discovery = VirtualDiscovery::mirroring(&bus);
        assert_eq!(bus.sink_count(), 1);

        drop(discovery);

        assert_eq!(bus.sink_count(), 0);
    }
}
