//! Device configuration parameters
//!
//! Feature gates and identity for the relay controller.
//! Values are persisted via NVS (see [`crate::adapters::nvs`]).

use serde::{Deserialize, Serialize};

/// Longest advertised BLE device name.
pub const MAX_DEVICE_NAME_LEN: usize = 24;

/// Relays on the on-board expander.
pub const MAX_RELAYS: u8 = 8;

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Advertised BLE name
    pub device_name: heapless::String<MAX_DEVICE_NAME_LEN>,

    // --- Feature gates ---
    /// Accept 2-byte RS485 bridge commands
    pub extension_enabled: bool,
    /// Accept 14-byte schedule commands
    pub scheduling_enabled: bool,

    /// Populated relay outputs (1-8)
    pub relay_count: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // Fits: 21 bytes < MAX_DEVICE_NAME_LEN.
        let _ = device_name.push_str("ESP32-8-CHANNEL-RELAY");
        Self {
            device_name,
            extension_enabled: false,
            scheduling_enabled: false,
            relay_count: MAX_RELAYS,
        }
    }
}

/// Range-check every field.  Used before persisting.
pub fn validate(cfg: &RelayConfig) -> Result<(), crate::app::ports::ConfigError> {
    use crate::app::ports::ConfigError;

    let name = cfg.device_name.as_str();
    if name.is_empty() {
        return Err(ConfigError::ValidationFailed("device_name must not be empty"));
    }
    if !name.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        return Err(ConfigError::ValidationFailed(
            "device_name must be printable ASCII",
        ));
    }
    if !(1..=MAX_RELAYS).contains(&cfg.relay_count) {
        return Err(ConfigError::ValidationFailed("relay_count must be 1–8"));
    }
    Ok(())
}
