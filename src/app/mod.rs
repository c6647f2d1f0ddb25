//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the decision rules for inbound relay commands:
//! frame routing, feature gating, and authenticated dispatch.
//! All interaction with clocks, relays, and buses happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
