//! A simulated key light.

use glowhub_domain::device::Device;
use glowhub_domain::error::GlowHubError;

const FIRMWARE: &str = "1.0.3";

/// One simulated light and the state it would report over the network.
#[derive(Debug, Clone)]
pub struct VirtualLight {
    serial: &'static str,
    name: &'static str,
    product: &'static str,
    address: &'static str,
    online: bool,
    power: bool,
    brightness: u8,
    temperature: u16,
}

impl VirtualLight {
    pub(crate) fn new(
        serial: &'static str,
        name: &'static str,
        product: &'static str,
        address: &'static str,
    ) -> Self {
        Self {
            serial,
            name,
            product,
            address,
            online: true,
            power: false,
            brightness: 20,
            temperature: 4000,
        }
    }

    #[must_use]
    pub fn serial(&self) -> &'static str {
        self.serial
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    pub(crate) fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Adopt the state of a registry snapshot.
    pub(crate) fn follow(&mut self, device: &Device) {
        self.power = device.power;
        self.brightness = device.brightness;
        self.temperature = device.temperature;
    }

    /// Produce the [`Device`] this light announces.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails (should not happen
    /// with hardcoded inputs).
    pub fn describe(&self) -> Result<Device, GlowHubError> {
        Device::builder()
            .id(self.serial)
            .name(self.name)
            .address(self.address)
            .power(self.power)
            .brightness(self.brightness)
            .temperature(self.temperature)
            .firmware(FIRMWARE)
            .product(self.product)
            .build()
    }
}
