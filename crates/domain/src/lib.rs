//! # glowhub-domain
//!
//! Pure domain model for the glowhub lighting hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (network lights with power, brightness and colour temperature)
//! - Define **Properties** (the controllable attributes of a device and their domains)
//! - Define **Groups** (named sets of devices controlled together)
//! - Define **Events** (immutable records of state changes)
//! - Contain all invariant enforcement: validation and clamping
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod group;
pub mod property;
