//! Error types for the RelayGate firmware.
//!
//! Two families live here:
//!
//! - [`RejectReason`]: the per-frame decision taxonomy.  Every inbound
//!   frame that does not reach a collaborator ends in exactly one of these.
//!   They are informational, never fatal, and `Copy` so the service can
//!   count and emit them without allocation.
//! - [`Error`]: firmware-wide failures (bootstrap, storage, actuators).

use core::fmt;

pub use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Frame rejection reasons
// ---------------------------------------------------------------------------

/// Why a single inbound frame was refused.
///
/// No variant ever causes an actuation, retry, or reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Frame length matches none of the recognised families (2, 14, 17, 34).
    UnsupportedLength,
    /// Hex decode failed, a sentinel/opcode byte was wrong, or a field was
    /// out of range.
    MalformedPayload,
    /// Authentication attempted before the clock was ever synchronised.
    ClockUntrusted,
    /// Claimed time lies outside the ±120 s freshness window.
    StaleOrFutureCommand,
    /// MAC tag mismatch.
    AuthenticationFailed,
    /// Unauthenticated path attempted while its enabling flag is off.
    FeatureDisabled,
}

impl RejectReason {
    /// Every reason, in a stable order (used for per-reason counters).
    pub const ALL: [Self; 6] = [
        Self::UnsupportedLength,
        Self::MalformedPayload,
        Self::ClockUntrusted,
        Self::StaleOrFutureCommand,
        Self::AuthenticationFailed,
        Self::FeatureDisabled,
    ];

    /// Stable index into [`Self::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::UnsupportedLength => 0,
            Self::MalformedPayload => 1,
            Self::ClockUntrusted => 2,
            Self::StaleOrFutureCommand => 3,
            Self::AuthenticationFailed => 4,
            Self::FeatureDisabled => 5,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedLength => write!(f, "unsupported frame length"),
            Self::MalformedPayload => write!(f, "malformed payload"),
            Self::ClockUntrusted => write!(f, "clock not yet synchronised"),
            Self::StaleOrFutureCommand => write!(f, "claimed time outside freshness window"),
            Self::AuthenticationFailed => write!(f, "MAC mismatch"),
            Self::FeatureDisabled => write!(f, "feature disabled"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible non-frame operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Non-volatile storage failed.
    Storage(StorageError),
    /// The BLE or RS485 link failed.
    Comms(CommsError),
    /// A relay could not be driven.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Channel number has no relay or group action.
    InvalidChannel(u8),
    /// The I²C expander did not acknowledge.
    BusWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "invalid relay channel {ch}"),
            Self::BusWriteFailed => write!(f, "relay expander write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    BleInitFailed,
    Rs485WriteFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BleInitFailed => write!(f, "BLE init failed"),
            Self::Rs485WriteFailed => write!(f, "RS485 write failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
