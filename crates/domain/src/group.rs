//! Group: a named set of devices controlled together (a room, a desk setup).

use serde::{Deserialize, Serialize};

use crate::error::{GlowHubError, ValidationError};
use crate::id::{DeviceId, GroupId};

/// A named set of devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<DeviceId>,
}

impl Group {
    /// Create a builder for constructing a [`Group`].
    #[must_use]
    pub fn builder() -> GroupBuilder {
        GroupBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), GlowHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Add a member, keeping insertion order. Returns `false` if already present.
    pub fn add_member(&mut self, device_id: DeviceId) -> bool {
        if self.members.contains(&device_id) {
            return false;
        }
        self.members.push(device_id);
        true
    }

    /// Remove a member. Returns `false` if it was not present.
    pub fn remove_member(&mut self, device_id: &DeviceId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| member != device_id);
        self.members.len() != before
    }
}

/// Step-by-step builder for [`Group`].
#[derive(Debug, Default)]
pub struct GroupBuilder {
    id: Option<GroupId>,
    name: Option<String>,
    members: Vec<DeviceId>,
}

impl GroupBuilder {
    #[must_use]
    pub fn id(mut self, id: GroupId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn member(mut self, device_id: impl Into<DeviceId>) -> Self {
        self.members.push(device_id.into());
        self
    }

    /// Consume the builder, validate, and return a [`Group`].
    ///
    /// Duplicate members are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] if `name` is missing or empty.
    pub fn build(self) -> Result<Group, GlowHubError> {
        let mut group = Group {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            members: Vec::with_capacity(self.members.len()),
        };
        for member in self.members {
            group.add_member(member);
        }
        group.validate()?;
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_valid_group_when_name_provided() {
        let group = Group::builder().name("Studio").build().unwrap();
        assert_eq!(group.name, "Studio");
        assert!(group.members.is_empty());
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = Group::builder().build();
        assert!(matches!(
            result,
            Err(GlowHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_drop_duplicate_members() {
        let group = Group::builder()
            .name("Desk")
            .member("KL-01")
            .member("KL-02")
            .member("KL-01")
            .build()
            .unwrap();
        assert_eq!(
            group.members,
            vec![DeviceId::new("KL-01"), DeviceId::new("KL-02")]
        );
    }

    #[test]
    fn should_report_membership_changes() {
        let mut group = Group::builder().name("Desk").build().unwrap();
        assert!(group.add_member(DeviceId::new("KL-01")));
        assert!(!group.add_member(DeviceId::new("KL-01")));
        assert!(group.remove_member(&DeviceId::new("KL-01")));
        assert!(!group.remove_member(&DeviceId::new("KL-01")));
    }
}
