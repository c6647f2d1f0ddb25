//! Authenticated command path: normalize, freshness gate, MAC check.
//!
//! ```text
//! Received ──▶ Normalized ──▶ TimeChecked ──▶ MacChecked ──▶ Accepted
//!    │              │              │               │
//!    └──────────────┴──────────────┴───────────────┴──▶ Rejected(reason)
//! ```
//!
//! Each stage runs at most once per frame and the first failure is
//! terminal.  The clock is consulted through a single [`TimeSnapshot`]
//! taken by the caller before the pipeline starts.

use log::debug;

use crate::error::RejectReason;

use super::freshness::{self, TimeSnapshot};
use super::mac::{self, SharedSecret};
use super::normalize::{self, CanonicalCommand};

/// Raw authenticated payload in either wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPayload<'a> {
    Binary(&'a [u8; 17]),
    Hex(&'a [u8; 34]),
}

/// Last stage a frame reached (for logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Received,
    Normalized,
    TimeChecked,
    MacChecked,
}

/// A command that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated {
    pub channel: u8,
    pub claimed_time: u32,
    /// `|now - claimed_time|` at the moment of the decision.
    pub delta_secs: u32,
}

/// Rejection annotated with the stage that refused the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFailure {
    pub stage: AuthStage,
    pub reason: RejectReason,
}

impl From<AuthFailure> for RejectReason {
    fn from(f: AuthFailure) -> Self {
        f.reason
    }
}

/// Convert either encoding into the canonical form.
pub fn normalize(payload: AuthPayload<'_>) -> Result<CanonicalCommand, RejectReason> {
    match payload {
        AuthPayload::Binary(raw) => Ok(normalize::normalize_binary(raw)),
        AuthPayload::Hex(raw) => normalize::normalize_hex(raw),
    }
}

/// Run the full authenticated pipeline for one frame.
pub fn authenticate(
    payload: AuthPayload<'_>,
    snapshot: TimeSnapshot,
    secret: &SharedSecret,
) -> Result<Authenticated, AuthFailure> {
    let fail = |stage, reason| AuthFailure { stage, reason };

    let cmd = normalize(payload).map_err(|r| fail(AuthStage::Received, r))?;
    debug!(
        "auth: normalized ({}), channel={} claimed={}",
        match payload {
            AuthPayload::Binary(_) => "binary",
            AuthPayload::Hex(_) => "hex",
        },
        cmd.channel(),
        cmd.claimed_time()
    );

    let delta_secs = freshness::check(cmd.claimed_time(), snapshot)
        .map_err(|r| fail(AuthStage::Normalized, r))?;
    debug!("auth: now={} delta={}s", snapshot.now_utc, delta_secs);

    mac::verify(&cmd, secret).map_err(|r| fail(AuthStage::TimeChecked, r))?;

    Ok(Authenticated {
        channel: cmd.channel(),
        claimed_time: cmd.claimed_time(),
        delta_secs,
    })
}
