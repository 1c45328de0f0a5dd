//! # glowhub-app
//!
//! Application core: the live device view and its notification fan-out.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Transport`: a persistent subscriber connection (send, keepalive, receive, close)
//!   - `EventEncoder`: turns an event into the bytes a subscriber receives
//!   - `Discovery`: finds devices on the network
//! - Provide the **core components**:
//!   - `DeviceRegistry`: authoritative device map with a stale-device sweep
//!   - `EventBus`: explicitly owned publish/subscribe mediator
//!   - `BroadcastHub`: per-subscriber bounded outboxes, keepalive, evict-on-stall
//! - Provide use-case services (`GroupService`) and the `DiscoveryRunner`
//! - Tie every background task to one `Lifecycle` signal
//!
//! ## Dependency rule
//! Depends on `glowhub-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod discovery;
pub mod event_bus;
pub mod hub;
pub mod lifecycle;
pub mod ports;
pub mod registry;
pub mod services;
