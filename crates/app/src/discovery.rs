//! Periodic device discovery.
//!
//! A [`DiscoveryRunner`] asks one [`Discovery`] adapter for the devices it can
//! currently see and upserts each of them into the registry, refreshing their
//! `last_seen`. Devices that stop showing up are eventually removed by the
//! registry's cleanup sweep.

use std::time::Duration;

use tokio::task::JoinHandle;

use glowhub_domain::error::GlowHubError;

use crate::lifecycle::ShutdownSignal;
use crate::ports::Discovery;
use crate::registry::DeviceRegistry;

/// Drives a [`Discovery`] adapter on a fixed interval.
pub struct DiscoveryRunner<D> {
    discovery: D,
    registry: DeviceRegistry,
    interval: Duration,
}

impl<D: Discovery> DiscoveryRunner<D> {
    pub fn new(discovery: D, registry: DeviceRegistry, interval: Duration) -> Self {
        Self {
            discovery,
            registry,
            interval,
        }
    }

    /// Run a single discovery pass.
    ///
    /// Returns how many devices were upserted. Devices that fail validation
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's failure to discover.
    pub async fn run_once(&mut self) -> Result<usize, GlowHubError> {
        let devices = self.discovery.discover().await?;
        let mut upserted = 0;
        for device in devices {
            let device_id = device.id.clone();
            match self.registry.upsert(device) {
                Ok(_) => upserted += 1,
                Err(err) => tracing::warn!(
                    discovery = self.discovery.name(),
                    %device_id,
                    error = %err,
                    "discovered device rejected"
                ),
            }
        }
        Ok(upserted)
    }

    /// Spawn the discovery loop. The first pass runs immediately.
    pub fn start(mut self, mut shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let name = self.discovery.name();
            tracing::info!(discovery = name, interval = ?self.interval, "discovery started");
            loop {
                tokio::select! {
                    () = shutdown.wait() => break,
                    _ = ticker.tick() => match self.run_once().await {
                        Ok(count) => tracing::debug!(discovery = name, count, "discovery pass"),
                        Err(err) => tracing::warn!(discovery = name, error = %err, "discovery failed"),
                    },
                }
            }
            tracing::info!(discovery = name, "discovery stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use glowhub_domain::device::Device;
    use glowhub_domain::error::NotFoundError;
    use glowhub_domain::id::DeviceId;

    use super::*;
    use crate::event_bus::EventBus;
    use crate::lifecycle::Lifecycle;

    struct StubDiscovery {
        devices: Vec<Device>,
        passes: Arc<AtomicUsize>,
        fail: bool,
    }

    impl StubDiscovery {
        fn with(devices: Vec<Device>) -> Self {
            Self {
                devices,
                passes: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }
    }

    impl Discovery for StubDiscovery {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn discover(&mut self) -> impl Future<Output = Result<Vec<Device>, GlowHubError>> + Send {
            self.passes.fetch_add(1, Ordering::SeqCst);
            let result: Result<Vec<Device>, GlowHubError> = if self.fail {
                Err(NotFoundError {
                    entity: "Network",
                    id: "lan".to_string(),
                }
                .into())
            } else {
                Ok(self.devices.clone())
            };
            async { result }
        }
    }

    fn light(id: &str) -> Device {
        Device::builder().id(id).address("10.0.0.7").build().unwrap()
    }

    #[tokio::test]
    async fn should_upsert_every_discovered_device() {
        let registry = DeviceRegistry::new(EventBus::new());
        let mut runner = DiscoveryRunner::new(
            StubDiscovery::with(vec![light("KL-01"), light("KL-02")]),
            registry.clone(),
            Duration::from_secs(60),
        );

        let count = runner.run_once().await.unwrap();

        assert_eq!(count, 2);
        assert!(registry.contains(&DeviceId::new("KL-02")));
    }

    #[tokio::test]
    async fn should_skip_invalid_devices() {
        let registry = DeviceRegistry::new(EventBus::new());
        let mut nameless = light("KL-02");
        nameless.name = " ".to_string();
        let mut runner = DiscoveryRunner::new(
            StubDiscovery::with(vec![light("KL-01"), nameless]),
            registry.clone(),
            Duration::from_secs(60),
        );

        assert_eq!(runner.run_once().await.unwrap(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn should_propagate_discovery_failure() {
        let registry = DeviceRegistry::new(EventBus::new());
        let mut stub = StubDiscovery::with(vec![light("KL-01")]);
        stub.fail = true;
        let mut runner = DiscoveryRunner::new(stub, registry.clone(), Duration::from_secs(60));

        assert!(runner.run_once().await.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn should_run_until_shutdown() {
        let registry = DeviceRegistry::new(EventBus::new());
        let lifecycle = Lifecycle::new();
        let stub = StubDiscovery::with(vec![light("KL-01")]);
        let passes = Arc::clone(&stub.passes);
        let runner = DiscoveryRunner::new(stub, registry.clone(), Duration::from_millis(10));

        let handle = runner.start(lifecycle.signal());
        tokio::time::sleep(Duration::from_millis(50)).await;
        lifecycle.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(passes.load(Ordering::SeqCst) >= 2);
        assert!(registry.contains(&DeviceId::new("KL-01")));
    }
}
