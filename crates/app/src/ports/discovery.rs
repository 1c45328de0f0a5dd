//! Discovery port: finds devices on the network.
//!
//! A discovery bridges an external protocol (mDNS, SSDP, a simulator, …) into
//! glowhub. The [`DiscoveryRunner`](crate::discovery::DiscoveryRunner) polls it
//! periodically and upserts whatever it reports into the registry, which is
//! what keeps `last_seen` fresh for devices that are still around.

use std::future::Future;

use glowhub_domain::device::Device;
use glowhub_domain::error::GlowHubError;

/// A pluggable device discovery mechanism.
pub trait Discovery: Send + 'static {
    /// Unique name identifying this discovery (e.g. `"virtual"`).
    fn name(&self) -> &'static str;

    /// Run one discovery pass and return every device currently reachable.
    fn discover(&mut self) -> impl Future<Output = Result<Vec<Device>, GlowHubError>> + Send;
}
