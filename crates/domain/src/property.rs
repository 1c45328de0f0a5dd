//! Controllable device properties and their value domains.
//!
//! Raw values arriving from the outside are resolved into a typed [`Setting`]
//! before they touch a [`Device`](crate::device::Device). Numeric values
//! outside the domain are clamped to the nearest bound; values of the wrong
//! kind are rejected.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;

/// Brightness in percent.
pub const BRIGHTNESS_RANGE: RangeInclusive<u8> = 0..=100;

/// Colour temperature in Kelvin.
pub const TEMPERATURE_RANGE: RangeInclusive<u16> = 2900..=7000;

/// A controllable attribute of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    Power,
    Brightness,
    Temperature,
}

impl Property {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Brightness => "brightness",
            Self::Temperature => "temperature",
        }
    }

    /// Validate `value` against this property's domain.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongKind`] when `value` is not of the kind the
    /// property expects (boolean for power, integer otherwise).
    pub fn resolve(self, value: PropertyValue) -> Result<Setting, PropertyError> {
        match (self, value) {
            (Self::Power, PropertyValue::Bool(on)) => Ok(Setting::Power(on)),
            (Self::Power, PropertyValue::Int(raw)) if raw == 0 || raw == 1 => {
                Ok(Setting::Power(raw == 1))
            }
            (Self::Power, PropertyValue::Int(_)) => Err(PropertyError::WrongKind {
                property: self,
                expected: "a boolean",
            }),
            (Self::Brightness, PropertyValue::Int(raw)) => {
                Ok(Setting::Brightness(clamp_to(raw, &BRIGHTNESS_RANGE)))
            }
            (Self::Temperature, PropertyValue::Int(raw)) => {
                Ok(Setting::Temperature(clamp_to(raw, &TEMPERATURE_RANGE)))
            }
            (Self::Brightness | Self::Temperature, PropertyValue::Bool(_)) => {
                Err(PropertyError::WrongKind {
                    property: self,
                    expected: "an integer",
                })
            }
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "power" | "on" => Ok(Self::Power),
            "brightness" => Ok(Self::Brightness),
            "temperature" => Ok(Self::Temperature),
            _ => Err(PropertyError::Unknown(s.to_string())),
        }
    }
}

/// A raw, not yet validated property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
}

/// A validated, in-domain property assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Power(bool),
    Brightness(u8),
    Temperature(u16),
}

/// Clamp a brightness value into [`BRIGHTNESS_RANGE`].
#[must_use]
pub fn clamp_brightness(raw: u8) -> u8 {
    raw.clamp(*BRIGHTNESS_RANGE.start(), *BRIGHTNESS_RANGE.end())
}

/// Clamp a colour temperature into [`TEMPERATURE_RANGE`].
#[must_use]
pub fn clamp_temperature(raw: u16) -> u16 {
    raw.clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end())
}

fn clamp_to<T>(raw: i64, range: &RangeInclusive<T>) -> T
where
    T: Copy + Into<i64> + TryFrom<i64>,
{
    let low: i64 = (*range.start()).into();
    let high: i64 = (*range.end()).into();
    T::try_from(raw.clamp(low, high)).unwrap_or(*range.end())
}
