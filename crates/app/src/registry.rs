//! Device registry: the authoritative view of every known device.
//!
//! Every mutation runs under one registry-wide mutation lock together with the
//! event it publishes, so for any device the order of published events always
//! matches the order in which mutations were applied. The device map itself
//! sits behind a separate `RwLock` that is only held for the in-memory swap:
//! readers never wait on event publication.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;

use glowhub_domain::device::Device;
use glowhub_domain::error::{GlowHubError, NotFoundError};
use glowhub_domain::event::{Event, EventType};
use glowhub_domain::id::DeviceId;
use glowhub_domain::property::{Property, PropertyValue};
use glowhub_domain::time::{Timestamp, is_stale, now};

use crate::event_bus::EventBus;
use crate::lifecycle::ShutdownSignal;

struct RegistryInner {
    devices: RwLock<HashMap<DeviceId, Device>>,
    mutation: Mutex<()>,
    bus: EventBus,
}

/// Concurrent device store that publishes every change on the [`EventBus`].
///
/// Cloning is cheap; clones share the same devices.
#[derive(Clone)]
pub struct DeviceRegistry {
    inner: Arc<RegistryInner>,
}

impl DeviceRegistry {
    /// Create an empty registry publishing on `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                devices: RwLock::new(HashMap::new()),
                mutation: Mutex::new(()),
                bus,
            }),
        }
    }

    /// Insert or replace a device seen just now.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] if the device breaks its invariants.
    pub fn upsert(&self, device: Device) -> Result<Device, GlowHubError> {
        self.upsert_at(device, now())
    }

    /// Insert or replace a device observed at `seen_at`.
    ///
    /// Firmware and product of an already known device are kept. Publishes
    /// `device-discovered` on first insert and `device-updated` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::Validation`] if the device breaks its invariants.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub fn upsert_at(&self, mut device: Device, seen_at: Timestamp) -> Result<Device, GlowHubError> {
        device.clamp();
        device.validate()?;
        device.last_seen = seen_at;

        let _guard = self.lock_mutation();
        let previous = {
            let mut devices = self.write_devices();
            if let Some(existing) = devices.get(&device.id) {
                device.keep_metadata_of(existing);
            }
            devices.insert(device.id.clone(), device.clone())
        };

        let event_type = if previous.is_some() {
            EventType::DeviceUpdated
        } else {
            tracing::info!(name = %device.name, address = %device.address, "device discovered");
            EventType::DeviceDiscovered
        };
        self.inner.bus.publish(Event::device(event_type, device.clone()));
        Ok(device)
    }

    /// Look up a device by id.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] when no device with `id` exists.
    pub fn get(&self, id: &DeviceId) -> Result<Device, GlowHubError> {
        self.read_devices()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Snapshot of every device, sorted by id.
    #[must_use]
    pub fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.read_devices().values().cloned().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_devices().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_devices().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.read_devices().contains_key(id)
    }

    /// Validate, clamp and apply one property, then publish `device-updated`.
    ///
    /// Counts as a successful command round-trip, so `last_seen` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] if `id` is unknown and
    /// [`GlowHubError::InvalidProperty`] if `value` has the wrong kind. The
    /// stored device is untouched on error.
    #[tracing::instrument(skip(self), fields(device_id = %id))]
    pub fn set_property(
        &self,
        id: &DeviceId,
        property: Property,
        value: PropertyValue,
    ) -> Result<Device, GlowHubError> {
        let setting = property.resolve(value)?;

        let _guard = self.lock_mutation();
        let updated = {
            let mut devices = self.write_devices();
            let current = devices.get(id).ok_or_else(|| not_found(id))?;
            let mut updated = current.clone();
            updated.apply(setting);
            updated.last_seen = now();
            devices.insert(id.clone(), updated.clone());
            updated
        };

        self.inner
            .bus
            .publish(Event::device(EventType::DeviceUpdated, updated.clone()));
        Ok(updated)
    }

    /// Refresh `last_seen` after a successful command round-trip.
    ///
    /// Publishes nothing: liveness alone is not a state change.
    ///
    /// # Errors
    ///
    /// Returns [`GlowHubError::NotFound`] when no device with `id` exists.
    pub fn mark_seen(&self, id: &DeviceId) -> Result<(), GlowHubError> {
        let _guard = self.lock_mutation();
        let mut devices = self.write_devices();
        let device = devices.get_mut(id).ok_or_else(|| not_found(id))?;
        device.last_seen = now();
        Ok(())
    }

    /// Remove a device and publish `device-removed`.
    ///
    /// Removing an unknown id is not an error and publishes nothing.
    #[tracing::instrument(skip(self), fields(device_id = %id))]
    pub fn remove(&self, id: &DeviceId) -> Option<Device> {
        let _guard = self.lock_mutation();
        let removed = self.write_devices().remove(id)?;
        self.inner
            .bus
            .publish(Event::device(EventType::DeviceRemoved, removed.clone()));
        Some(removed)
    }

    /// Run one sweep pass against the current time.
    pub fn sweep(&self, timeout: Duration) -> Vec<DeviceId> {
        self.sweep_at(now(), timeout)
    }

    /// Remove every device whose `last_seen` is older than `timeout` at `now`.
    ///
    /// Candidates are collected under the read lock; each one is then removed
    /// on its own, re-checked under the mutation lock so a device refreshed
    /// in between survives. Returns the ids that were actually removed.
    pub fn sweep_at(&self, now: Timestamp, timeout: Duration) -> Vec<DeviceId> {
        let candidates: Vec<DeviceId> = self
            .read_devices()
            .values()
            .filter(|device| is_stale(device.last_seen, now, timeout))
            .map(|device| device.id.clone())
            .collect();

        let mut removed = Vec::with_capacity(candidates.len());
        for id in candidates {
            if self.remove_if_stale(&id, now, timeout) {
                removed.push(id);
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "stale devices removed");
        }
        removed
    }

    /// Spawn the periodic sweep. Stops when `shutdown` fires.
    pub fn start_cleanup(
        &self,
        interval: Duration,
        timeout: Duration,
        mut shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = shutdown.wait() => break,
                    _ = ticker.tick() => {
                        registry.sweep(timeout);
                    }
                }
            }
            tracing::debug!("registry cleanup stopped");
        })
    }

    fn remove_if_stale(&self, id: &DeviceId, now: Timestamp, timeout: Duration) -> bool {
        let _guard = self.lock_mutation();
        let removed = {
            let mut devices = self.write_devices();
            match devices.get(id) {
                Some(device) if is_stale(device.last_seen, now, timeout) => devices.remove(id),
                _ => None,
            }
        };
        match removed {
            Some(device) => {
                tracing::debug!(device_id = %id, last_seen = %device.last_seen, "device expired");
                self.inner
                    .bus
                    .publish(Event::device(EventType::DeviceRemoved, device));
                true
            }
            None => false,
        }
    }

    fn lock_mutation(&self) -> MutexGuard<'_, ()> {
        self.inner
            .mutation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_devices(&self) -> std::sync::RwLockReadGuard<'_, HashMap<DeviceId, Device>> {
        self.inner
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_devices(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<DeviceId, Device>> {
        self.inner
            .devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &DeviceId) -> GlowHubError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}
