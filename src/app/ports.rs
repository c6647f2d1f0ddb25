//! Port traits: the hexagonal boundary between the command core and its
//! collaborators.
//!
//! ```text
//!   TimeSource ─┐                         ┌──▶ RelayPort
//! FeatureGates ─┼──▶ CommandService ──────┼──▶ BridgePort
//!   raw frame ──┘   (decision only)       ├──▶ SchedulePort
//!                                         └──▶ EventSink
//! ```
//!
//! Collaborators are injected at call sites via generics, so the core can
//! be exercised with mock adapters on the host.
//!
//! ## Contract notes
//!
//! - Driven ports (`RelayPort`, `BridgePort`) are fire-and-forget: the
//!   core never waits on or inspects their outcome.  Adapters log their
//!   own failures.
//! - `TimeSource` readings are taken once per frame via
//!   [`TimeSource::snapshot`].

use core::fmt;

use crate::config::RelayConfig;
use crate::protocol::freshness::TimeSnapshot;
use crate::protocol::schedule::TimerEvent;

// ───────────────────────────────────────────────────────────────
// Time source (driving collaborator: clock sync → core)
// ───────────────────────────────────────────────────────────────

/// External UTC clock with a latched "has ever synchronised" flag.
pub trait TimeSource {
    /// `true` once the clock has been synchronised at least once.
    fn is_time_trustworthy(&self) -> bool;

    /// Current UTC seconds since the epoch.
    fn current_utc_seconds(&self) -> u32;

    /// One reading of both values, trust first.
    ///
    /// Adapters that can read both atomically should override this.
    fn snapshot(&self) -> TimeSnapshot {
        let trusted = self.is_time_trustworthy();
        TimeSnapshot {
            trusted,
            now_utc: self.current_utc_seconds(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Feature gates (configuration flags for unauthenticated paths)
// ───────────────────────────────────────────────────────────────

pub trait FeatureGates {
    /// Gate for the 2-byte RS485 bridge command.
    fn extension_enabled(&self) -> bool;

    /// Gate for the 14-byte scheduling command.
    fn scheduling_enabled(&self) -> bool;
}

impl FeatureGates for RelayConfig {
    fn extension_enabled(&self) -> bool {
        self.extension_enabled
    }

    fn scheduling_enabled(&self) -> bool {
        self.scheduling_enabled
    }
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven: core → relay outputs)
// ───────────────────────────────────────────────────────────────

pub trait RelayPort {
    /// Act on an authenticated channel command.
    fn actuate(&mut self, channel: u8);

    /// Drive one relay to a fixed state (scheduled actions).
    fn set_channel(&mut self, channel: u8, on: bool);

    /// Drive every relay from a bitmask, bit 0 = relay 1.
    fn set_mask(&mut self, mask: u8);
}

// ───────────────────────────────────────────────────────────────
// Bridge port (driven: core → RS485 off-board relays)
// ───────────────────────────────────────────────────────────────

pub trait BridgePort {
    /// Send the pre-defined frame named by `selector`.
    fn forward(&mut self, selector: u8);
}

// ───────────────────────────────────────────────────────────────
// Schedule port (driven: core → timer table)
// ───────────────────────────────────────────────────────────────

pub trait SchedulePort {
    fn program(&mut self, event: TimerEvent) -> Result<(), SchedulerError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven: core → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s here.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration + storage ports
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`RelayConfig`].
///
/// Implementations MUST validate before persisting; invalid values are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Returns [`RelayConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<RelayConfig, ConfigError>;

    fn save(&self, config: &RelayConfig) -> Result<(), ConfigError>;
}

/// Namespaced key-value storage (NVS on target).
///
/// Writes MUST be atomic.  The shared secret lives in its own namespace,
/// which sits on the encrypted partition on target.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// Every timer slot is in use.
    Full,
    /// The event's date-time has no UTC timestamp (e.g. before 1970).
    Unrepresentable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The selector names no pre-defined frame.
    UnknownSelector(u8),
    /// The transceiver did not accept the frame.
    WriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    NotFound,
    Corrupted,
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
    StorageFull,
    IoError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
    EncryptionError,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "timer table full"),
            Self::Unrepresentable => write!(f, "event time not representable"),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSelector(sel) => write!(f, "unknown bridge selector {}", sel),
            Self::WriteFailed => write!(f, "RS485 write failed"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::EncryptionError => write!(f, "encryption error"),
        }
    }
}
