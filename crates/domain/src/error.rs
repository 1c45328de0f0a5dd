//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`GlowHubError`] via `#[from]`; there are no `String` variants.

use crate::property::Property;

/// Top-level error returned by domain and application operations.
#[derive(Debug, thiserror::Error)]
pub enum GlowHubError {
    /// A device or group failed its invariants.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The referenced device or group does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A property name or value was rejected.
    #[error("invalid property")]
    InvalidProperty(#[from] PropertyError),

    /// A subscriber transport could not be used.
    #[error("transport failure")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation was invoked after the component shut down.
    #[error("component is shut down")]
    ShutDown,
}

/// Invariant violations on domain objects.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyId,

    #[error("name must not be empty")]
    EmptyName,
}

/// Lookup failure for an identified object.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of object that was looked up (`"Device"`, `"Group"`).
    pub entity: &'static str,
    /// The identifier that was not found.
    pub id: String,
}

/// Rejections produced when parsing or applying a property value.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("unknown property {0:?}")]
    Unknown(String),

    #[error("property {property} expects {expected} value")]
    WrongKind {
        property: Property,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "KL-01".to_string(),
        };
        assert_eq!(err.to_string(), "Device KL-01 not found");
    }

    #[test]
    fn should_display_wrong_kind_with_property_name() {
        let err = PropertyError::WrongKind {
            property: Property::Brightness,
            expected: "an integer",
        };
        assert_eq!(
            err.to_string(),
            "property brightness expects an integer value"
        );
    }

    #[test]
    fn should_convert_property_error_into_invalid_property() {
        let err: GlowHubError = PropertyError::Unknown("hue".to_string()).into();
        assert!(matches!(err, GlowHubError::InvalidProperty(_)));
    }

    #[test]
    fn should_keep_transport_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err = GlowHubError::Transport(Box::new(io));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "gone");
    }
}
