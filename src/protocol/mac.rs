//! MAC verifier: truncated HMAC-SHA256 over `channel ‖ claimed_time`.
//!
//! Crypto is handled by the `hmac-sha256` crate (pure Rust, no_std,
//! identical on ESP-IDF and host targets).  The tag comparison walks all
//! twelve byte pairs and folds the differences, so timing does not depend
//! on where the first mismatch sits.

use core::fmt;

use crate::error::RejectReason;

use super::normalize::{CanonicalCommand, TAG_LEN};

/// Full HMAC-SHA256 output size.
pub const MAC_LEN: usize = 32;

/// Size of the signed message: channel byte plus four time bytes.
pub const MESSAGE_LEN: usize = 5;

/// Upper bound on secret length (one SHA-256 block).
pub const MAX_SECRET_LEN: usize = 64;

// ── Shared secret ────────────────────────────────────────────

/// The process-wide pre-shared key.
///
/// Immutable after construction and never printed: the `Debug` impl
/// only reveals the length.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    key: heapless::Vec<u8, MAX_SECRET_LEN>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretError {
    Empty,
    TooLong(usize),
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "shared secret must not be empty"),
            Self::TooLong(len) => {
                write!(f, "shared secret is {len} bytes (max {MAX_SECRET_LEN})")
            }
        }
    }
}

impl SharedSecret {
    pub fn new(key: &[u8]) -> Result<Self, SecretError> {
        if key.is_empty() {
            return Err(SecretError::Empty);
        }
        let key = heapless::Vec::from_slice(key).map_err(|()| SecretError::TooLong(key.len()))?;
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret(<redacted, {} bytes>)", self.key.len())
    }
}

// ── MAC computation ──────────────────────────────────────────

/// Build the signed message from the channel and the claimed-time bytes
/// exactly as they arrived on the wire.
pub fn message(channel: u8, time_bytes: [u8; 4]) -> [u8; MESSAGE_LEN] {
    let mut msg = [0u8; MESSAGE_LEN];
    msg[0] = channel;
    msg[1..].copy_from_slice(&time_bytes);
    msg
}

/// Full 32-byte HMAC-SHA256 of the message under `secret`.
pub fn compute_mac(secret: &SharedSecret, channel: u8, time_bytes: [u8; 4]) -> [u8; MAC_LEN] {
    hmac_sha256::HMAC::mac(message(channel, time_bytes), secret.as_bytes())
}

/// The 12-byte prefix carried on the wire.
pub fn compute_tag(secret: &SharedSecret, channel: u8, time_bytes: [u8; 4]) -> [u8; TAG_LEN] {
    let full = compute_mac(secret, channel, time_bytes);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&full[..TAG_LEN]);
    tag
}

/// Build a signed canonical command (client side; used by tests and tools).
pub fn sign(secret: &SharedSecret, channel: u8, claimed_time: u32) -> CanonicalCommand {
    let tag = compute_tag(secret, channel, claimed_time.to_be_bytes());
    CanonicalCommand::new(channel, claimed_time, tag)
}

/// Recompute the tag for `cmd` and compare it with the received one.
pub fn verify(cmd: &CanonicalCommand, secret: &SharedSecret) -> Result<(), RejectReason> {
    let expected = compute_tag(secret, cmd.channel(), cmd.time_bytes());
    if tags_equal(&expected, &cmd.mac_tag()) {
        Ok(())
    } else {
        Err(RejectReason::AuthenticationFailed)
    }
}

/// Fixed-width comparison: OR of XOR differences over every position.
fn tags_equal(a: &[u8; TAG_LEN], b: &[u8; TAG_LEN]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    core::hint::black_box(diff) == 0
}
