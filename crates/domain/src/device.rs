//! Device: a network light tracked by the registry.

use serde::{Deserialize, Serialize};

use crate::error::{GlowHubError, ValidationError};
use crate::id::DeviceId;
use crate::property::{BRIGHTNESS_RANGE, Setting, clamp_brightness, clamp_temperature};
use crate::time::{Timestamp, now};

/// Default colour temperature for freshly discovered lights, in Kelvin.
pub const DEFAULT_TEMPERATURE: u16 = 4000;

/// A remotely controllable light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub power: bool,
    pub brightness: u8,
    pub temperature: u16,
    pub firmware: Option<String>,
    pub product: Option<String>,
    pub last_seen: Timestamp,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] when:
    /// - `id` is blank ([`ValidationError::EmptyId`])
    /// - `name` is blank ([`ValidationError::EmptyName`])
    pub fn validate(&self) -> Result<(), GlowHubError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Force brightness and temperature back into their domains.
    pub fn clamp(&mut self) {
        self.brightness = clamp_brightness(self.brightness);
        self.temperature = clamp_temperature(self.temperature);
    }

    /// Apply a validated setting.
    pub fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Power(on) => self.power = on,
            Setting::Brightness(level) => self.brightness = level,
            Setting::Temperature(kelvin) => self.temperature = kelvin,
        }
    }

    /// Copy the read-only metadata captured at creation from `original`.
    pub fn keep_metadata_of(&mut self, original: &Device) {
        self.firmware.clone_from(&original.firmware);
        self.product.clone_from(&original.product);
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    address: Option<String>,
    port: Option<u16>,
    power: bool,
    brightness: Option<u8>,
    temperature: Option<u16>,
    firmware: Option<String>,
    product: Option<String>,
    last_seen: Option<Timestamp>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<DeviceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn power(mut self, on: bool) -> Self {
        self.power = on;
        self
    }

    #[must_use]
    pub fn brightness(mut self, level: u8) -> Self {
        self.brightness = Some(level);
        self
    }

    #[must_use]
    pub fn temperature(mut self, kelvin: u16) -> Self {
        self.temperature = Some(kelvin);
        self
    }

    #[must_use]
    pub fn firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = Some(firmware.into());
        self
    }

    #[must_use]
    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    #[must_use]
    pub fn last_seen(mut self, ts: Timestamp) -> Self {
        self.last_seen = Some(ts);
        self
    }

    /// Consume the builder, clamp, validate, and return a [`Device`].
    ///
    /// The name defaults to the identifier and the port to `9123`.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] if the id is missing or blank.
    pub fn build(self) -> Result<Device, GlowHubError> {
        let id = self.id.unwrap_or_else(|| DeviceId::new(""));
        let mut device = Device {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            address: self.address.unwrap_or_default(),
            port: self.port.unwrap_or(9123),
            power: self.power,
            brightness: self.brightness.unwrap_or(*BRIGHTNESS_RANGE.end()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            firmware: self.firmware,
            product: self.product,
            last_seen: self.last_seen.unwrap_or_else(now),
        };
        device.clamp();
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_name_to_id() {
        let device = Device::builder().id("KL-01").build().unwrap();
        assert_eq!(device.name, "KL-01");
        assert_eq!(device.port, 9123);
        assert_eq!(device.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn should_return_validation_error_when_id_missing() {
        let result = Device::builder().name("Desk").build();
        assert!(matches!(
            result,
            Err(GlowHubError::Validation(ValidationError::EmptyId))
        ));
    }

    #[test]
    fn should_return_validation_error_when_name_is_blank() {
        let result = Device::builder().id("KL-01").name("   ").build();
        assert!(matches!(
            result,
            Err(GlowHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_clamp_out_of_domain_values_on_build() {
        let device = Device::builder()
            .id("KL-01")
            .brightness(250)
            .temperature(12_000)
            .build()
            .unwrap();
        assert_eq!(device.brightness, 100);
        assert_eq!(device.temperature, 7000);
    }

    #[test]
    fn should_apply_each_setting() {
        let mut device = Device::builder().id("KL-01").build().unwrap();
        device.apply(Setting::Power(true));
        device.apply(Setting::Brightness(40));
        device.apply(Setting::Temperature(3300));
        assert!(device.power);
        assert_eq!(device.brightness, 40);
        assert_eq!(device.temperature, 3300);
    }

    #[test]
    fn should_keep_metadata_of_original() {
        let original = Device::builder()
            .id("KL-01")
            .firmware("1.0.3")
            .product("Key Light")
            .build()
            .unwrap();
        let mut rediscovered = Device::builder().id("KL-01").firmware("9.9").build().unwrap();
        rediscovered.keep_metadata_of(&original);
        assert_eq!(rediscovered.firmware.as_deref(), Some("1.0.3"));
        assert_eq!(rediscovered.product.as_deref(), Some("Key Light"));
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let device = Device::builder()
            .id("KL-01")
            .address("192.168.1.20")
            .build()
            .unwrap();
        let json = serde_json::to_string(&device).unwrap();
        let parsed: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, device);
    }
}
