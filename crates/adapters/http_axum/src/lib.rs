//! # glowhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for devices and groups
//!   (`/api/devices`, `/api/groups`, property writes)
//! - Serve the **live event feed** at `/api/events/ws`: every WebSocket is
//!   wrapped into a [`transport::WsTransport`] and admitted to the broadcast hub
//! - Map application results and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `glowhub-app` (registry, services, hub, transport port) and
//! `glowhub-domain` (types used in request/response mapping). Never leaks
//! axum types into the core.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
pub mod transport;
