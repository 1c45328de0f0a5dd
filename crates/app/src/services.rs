//! Application services: use-case implementations on top of the registry.

pub mod group_service;
