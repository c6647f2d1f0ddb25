//! Freshness & trust gate.
//!
//! Bounds the replay window of an authenticated command against a clock
//! snapshot.  This is a window, not a nonce: a captured frame replayed
//! inside the same ±120 s is indistinguishable from the original.

use crate::error::RejectReason;

/// Symmetric tolerance between claimed and current time, inclusive.
pub const FRESHNESS_WINDOW_SECS: u32 = 120;

/// One atomic reading of the external time source.
///
/// Taken once per frame; the gate never re-reads the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSnapshot {
    /// The clock has synchronised at least once.
    pub trusted: bool,
    /// Current UTC seconds since the epoch (meaningless when untrusted).
    pub now_utc: u32,
}

impl TimeSnapshot {
    pub const fn trusted(now_utc: u32) -> Self {
        Self {
            trusted: true,
            now_utc,
        }
    }

    pub const fn untrusted(now_utc: u32) -> Self {
        Self {
            trusted: false,
            now_utc,
        }
    }
}

/// Decide whether `claimed_time` is fresh relative to `snapshot`.
///
/// Returns the absolute delta in seconds on success.  Trust is checked
/// before any arithmetic on `claimed_time`: an unsynchronised clock reads
/// near zero and would otherwise yield a meaningless delta.
pub fn check(claimed_time: u32, snapshot: TimeSnapshot) -> Result<u32, RejectReason> {
    if !snapshot.trusted {
        return Err(RejectReason::ClockUntrusted);
    }

    let delta = snapshot.now_utc.abs_diff(claimed_time);
    if delta > FRESHNESS_WINDOW_SECS {
        return Err(RejectReason::StaleOrFutureCommand);
    }
    Ok(delta)
}
