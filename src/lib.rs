//! RelayGate firmware library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod protocol;
pub mod scheduler;

// Adapters and drivers carry simulation backends on the host, so they
// compile (and are tested) on every target.
pub mod adapters;
pub mod drivers;
pub mod pins;
