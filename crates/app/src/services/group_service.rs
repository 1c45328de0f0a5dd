//! Group service: use-cases for controlling several devices as one.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use glowhub_domain::device::Device;
use glowhub_domain::error::{GlowHubError, NotFoundError};
use glowhub_domain::event::{Event, EventType};
use glowhub_domain::group::Group;
use glowhub_domain::id::{DeviceId, GroupId};
use glowhub_domain::property::{Property, PropertyValue};

use crate::event_bus::EventBus;
use crate::registry::DeviceRegistry;

/// Application service for groups of devices.
///
/// Groups live in memory next to the registry; members are device ids that
/// must be known to the registry when they are added.
pub struct GroupService {
    groups: RwLock<HashMap<GroupId, Group>>,
    registry: DeviceRegistry,
    bus: EventBus,
}

impl GroupService {
    /// Create a new service over `registry`, publishing on `bus`.
    pub fn new(registry: DeviceRegistry, bus: EventBus) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            registry,
            bus,
        }
    }

    /// Create a new group after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] if invariants fail, or
    /// [`GlowHubError::NotFound`] if a member is not a known device.
    pub fn create_group(&self, group: Group) -> Result<Group, GlowHubError> {
        group.validate()?;
        for member in &group.members {
            self.registry.get(member)?;
        }
        self.write().insert(group.id, group.clone());
        tracing::info!(group_id = %group.id, name = %group.name, "group created");
        self.bus.publish(Event::group(EventType::GroupUpdated, group.clone()));
        Ok(group)
    }

    /// Look up a group by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] when no group with `id` exists.
    pub fn get_group(&self, id: GroupId) -> Result<Group, GlowHubError> {
        self.read().get(&id).cloned().ok_or_else(|| not_found(id))
    }

    /// List all groups, sorted by name.
    pub fn list_groups(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = self.read().values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups
    }

    /// Add a known device to a group.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] if the group or the device is unknown.
    pub fn add_member(&self, id: GroupId, device_id: DeviceId) -> Result<Group, GlowHubError> {
        self.registry.get(&device_id)?;
        self.update(id, |group| group.add_member(device_id))
    }

    /// Remove a device from a group.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] if the group is unknown.
    pub fn remove_member(&self, id: GroupId, device_id: &DeviceId) -> Result<Group, GlowHubError> {
        self.update(id, |group| group.remove_member(device_id))
    }

    /// Delete a group by id.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] when no group with `id` exists.
    pub fn delete_group(&self, id: GroupId) -> Result<(), GlowHubError> {
        let removed = self.write().remove(&id).ok_or_else(|| not_found(id))?;
        tracing::info!(group_id = %id, "group deleted");
        self.bus.publish(Event::group(EventType::GroupRemoved, removed));
        Ok(())
    }

    /// Apply one property to every member that is still in the registry.
    ///
    /// The value kind is checked once up front, so an invalid value changes
    /// nothing. Members that left the registry are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] if the group is unknown and
    /// [`GlowHubError::InvalidProperty`] if `value` has the wrong kind.
    pub fn set_property(
        &self,
        id: GroupId,
        property: Property,
        value: PropertyValue,
    ) -> Result<Vec<Device>, GlowHubError> {
        property.resolve(value)?;
        let group = self.get_group(id)?;

        let mut updated = Vec::with_capacity(group.members.len());
        for member in &group.members {
            match self.registry.set_property(member, property, value) {
                Ok(device) => updated.push(device),
                Err(GlowHubError::NotFound(_)) => {
                    tracing::debug!(group_id = %id, device_id = %member, "skipping missing member");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(updated)
    }

    fn update(
        &self,
        id: GroupId,
        change: impl FnOnce(&mut Group) -> bool,
    ) -> Result<Group, GlowHubError> {
        let snapshot = {
            let mut groups = self.write();
            let group = groups.get_mut(&id).ok_or_else(|| not_found(id))?;
            if !change(group) {
                return Ok(group.clone());
            }
            group.clone()
        };
        self.bus.publish(Event::group(EventType::GroupUpdated, snapshot.clone()));
        Ok(snapshot)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<GroupId, Group>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<GroupId, Group>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: GroupId) -> GlowHubError {
    NotFoundError {
        entity: "Group",
        id: id.to_string(),
    }
    .into()
}
