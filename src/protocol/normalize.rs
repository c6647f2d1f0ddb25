//! Payload normalizer: binary or ASCII-hex authenticated frames into one
//! canonical 17-byte command.
//!
//! Canonical layout:
//! ```text
//! ┌─────────┬──────────────────────┬──────────────────────────┐
//! │ channel │ claimed_time (BE u32)│ mac_tag (12 B, truncated)│
//! │  [0]    │       [1..5]         │         [5..17]          │
//! └─────────┴──────────────────────┴──────────────────────────┘
//! ```

use crate::error::RejectReason;

use super::classify::{AUTH_BINARY_LEN, AUTH_HEX_LEN};

/// Size of the canonical command.
pub const CANONICAL_LEN: usize = AUTH_BINARY_LEN;
/// Size of the truncated MAC tag carried on the wire.
pub const TAG_LEN: usize = 12;

const TIME_RANGE: core::ops::Range<usize> = 1..5;
const TAG_RANGE: core::ops::Range<usize> = 5..CANONICAL_LEN;

/// The normalized authenticated command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalCommand {
    bytes: [u8; CANONICAL_LEN],
}

impl CanonicalCommand {
    /// Assemble a command from its fields (client side and tests).
    pub fn new(channel: u8, claimed_time: u32, mac_tag: [u8; TAG_LEN]) -> Self {
        let mut bytes = [0u8; CANONICAL_LEN];
        bytes[0] = channel;
        bytes[TIME_RANGE].copy_from_slice(&claimed_time.to_be_bytes());
        bytes[TAG_RANGE].copy_from_slice(&mac_tag);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; CANONICAL_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; CANONICAL_LEN] {
        &self.bytes
    }

    pub fn channel(&self) -> u8 {
        self.bytes[0]
    }

    /// The claimed time exactly as received (big-endian byte layout).
    pub fn time_bytes(&self) -> [u8; 4] {
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.bytes[TIME_RANGE]);
        out
    }

    /// Sender-asserted UTC seconds since the epoch.
    pub fn claimed_time(&self) -> u32 {
        u32::from_be_bytes(self.time_bytes())
    }

    pub fn mac_tag(&self) -> [u8; TAG_LEN] {
        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(&self.bytes[TAG_RANGE]);
        out
    }

    /// Uppercase ASCII-hex wire form (34 bytes).
    pub fn to_hex(&self) -> [u8; AUTH_HEX_LEN] {
        let mut out = [0u8; AUTH_HEX_LEN];
        // Cannot fail: `out` is exactly twice the canonical length.
        let _ = hex::encode_to_slice(self.bytes, &mut out);
        out.make_ascii_uppercase();
        out
    }
}

/// Binary encoding: direct byte-for-byte copy.
pub fn normalize_binary(raw: &[u8; AUTH_BINARY_LEN]) -> CanonicalCommand {
    CanonicalCommand::from_bytes(*raw)
}

/// Hex encoding: 17 pairs of `[0-9A-Fa-f]`.
///
/// Any invalid character fails the whole decode; no partially decoded
/// output escapes.
pub fn normalize_hex(raw: &[u8; AUTH_HEX_LEN]) -> Result<CanonicalCommand, RejectReason> {
    let mut bytes = [0u8; CANONICAL_LEN];
    hex::decode_to_slice(raw, &mut bytes).map_err(|_| RejectReason::MalformedPayload)?;
    Ok(CanonicalCommand::from_bytes(bytes))
}
