//! Command service: the hexagonal core.
//!
//! [`CommandService`] owns the shared secret, the feature gates and the
//! frame counters.  It decides, per inbound frame, whether to accept and
//! which collaborator to hand it to.  All I/O flows through port traits
//! injected at call sites, so the whole decision path runs on the host.
//!
//! ```text
//!  TimeSource ──▶ ┌────────────────────────┐ ──▶ RelayPort
//!                 │     CommandService     │ ──▶ BridgePort
//!   raw frame ──▶ │ classify · gate · auth │ ──▶ SchedulePort
//!                 └────────────────────────┘ ──▶ EventSink
//! ```
//!
//! A rejected frame never reaches a collaborator.  An accepted frame
//! reaches exactly one, exactly once.

use log::{info, warn};

use crate::error::RejectReason;
use crate::protocol::auth::{self, AuthPayload};
use crate::protocol::classify::{self, Frame, FrameKind};
use crate::protocol::mac::SharedSecret;
use crate::protocol::{bridge, schedule};

use super::commands::Dispatched;
use super::events::AppEvent;
use super::ports::{BridgePort, EventSink, FeatureGates, RelayPort, SchedulePort, TimeSource};

// ───────────────────────────────────────────────────────────────
// FrameStats
// ───────────────────────────────────────────────────────────────

/// Running accept/reject counters, indexed by family and reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub accepted: u32,
    pub rejected: u32,
    rejected_by_reason: [u32; 6],
}

impl FrameStats {
    /// Rejections recorded for one reason.
    pub fn rejected_for(&self, reason: RejectReason) -> u32 {
        self.rejected_by_reason[reason.index()]
    }

    fn record_accept(&mut self) {
        self.accepted = self.accepted.saturating_add(1);
    }

    fn record_reject(&mut self, reason: RejectReason) {
        self.rejected = self.rejected.saturating_add(1);
        let slot = &mut self.rejected_by_reason[reason.index()];
        *slot = slot.saturating_add(1);
    }
}

// ───────────────────────────────────────────────────────────────
// CommandService
// ───────────────────────────────────────────────────────────────

pub struct CommandService<G: FeatureGates> {
    secret: SharedSecret,
    gates: G,
    stats: FrameStats,
}

impl<G: FeatureGates> CommandService<G> {
    pub fn new(secret: SharedSecret, gates: G) -> Self {
        Self {
            secret,
            gates,
            stats: FrameStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started);
        info!(
            "CommandService started (extension={}, scheduling={})",
            self.gates.extension_enabled(),
            self.gates.scheduling_enabled()
        );
    }

    // ── Frame handling ────────────────────────────────────────

    /// Decide one inbound frame and, on acceptance, invoke its collaborator.
    ///
    /// The `io` parameter satisfies all three driven ports; this avoids
    /// a triple mutable borrow while keeping the port boundary explicit.
    ///
    /// The clock is read at most once, and only for authenticated frames.
    pub fn handle_frame(
        &mut self,
        raw: &[u8],
        clock: &impl TimeSource,
        io: &mut (impl RelayPort + BridgePort + SchedulePort),
        sink: &mut impl EventSink,
    ) -> Result<Dispatched, RejectReason> {
        let frame = match classify::classify(raw) {
            Ok(f) => f,
            Err(reason) => return Err(self.reject(None, raw.len(), reason, sink)),
        };
        let kind = frame.kind();

        let decided = match frame {
            Frame::Bridge(bytes) => self.decide_bridge(bytes),
            Frame::Schedule(bytes) => self.decide_schedule(bytes),
            Frame::AuthBinary(bytes) => self.decide_auth(AuthPayload::Binary(bytes), clock),
            Frame::AuthHex(bytes) => self.decide_auth(AuthPayload::Hex(bytes), clock),
        };

        let dispatched = match decided {
            Ok(d) => d,
            Err(reason) => return Err(self.reject(Some(kind), raw.len(), reason, sink)),
        };

        // Decision made; from here on the frame counts as accepted.
        self.stats.record_accept();
        Self::dispatch(dispatched, io);
        sink.emit(&AppEvent::FrameAccepted { kind, dispatched });
        Ok(dispatched)
    }

    fn decide_bridge(&self, bytes: &[u8; 2]) -> Result<Dispatched, RejectReason> {
        if !self.gates.extension_enabled() {
            return Err(RejectReason::FeatureDisabled);
        }
        bridge::parse(bytes).map(Dispatched::Bridge)
    }

    fn decide_schedule(&self, bytes: &[u8; 14]) -> Result<Dispatched, RejectReason> {
        if !self.gates.scheduling_enabled() {
            return Err(RejectReason::FeatureDisabled);
        }
        schedule::parse(bytes).map(Dispatched::Schedule)
    }

    fn decide_auth(
        &self,
        payload: AuthPayload<'_>,
        clock: &impl TimeSource,
    ) -> Result<Dispatched, RejectReason> {
        let snapshot = clock.snapshot();
        match auth::authenticate(payload, snapshot, &self.secret) {
            Ok(ok) => {
                info!(
                    "auth: accepted channel={} claimed={} delta={}s",
                    ok.channel, ok.claimed_time, ok.delta_secs
                );
                Ok(Dispatched::Relay { channel: ok.channel })
            }
            Err(failure) => {
                warn!("auth: refused after {:?}: {}", failure.stage, failure.reason);
                Err(failure.reason)
            }
        }
    }

    fn dispatch(dispatched: Dispatched, io: &mut (impl RelayPort + BridgePort + SchedulePort)) {
        match dispatched {
            Dispatched::Relay { channel } => io.actuate(channel),
            Dispatched::Bridge(cmd) => io.forward(cmd.selector),
            Dispatched::Schedule(event) => {
                // A full table does not un-accept the frame.
                if let Err(e) = io.program(event) {
                    warn!("scheduler refused event: {}", e);
                }
            }
        }
    }

    fn reject(
        &mut self,
        kind: Option<FrameKind>,
        len: usize,
        reason: RejectReason,
        sink: &mut impl EventSink,
    ) -> RejectReason {
        self.stats.record_reject(reason);
        sink.emit(&AppEvent::FrameRejected { kind, len, reason });
        reason
    }

    // ── Queries / updates ─────────────────────────────────────

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn gates(&self) -> &G {
        &self.gates
    }

    /// Replace the feature gates (e.g. after a config reload).
    pub fn set_gates(&mut self, gates: G) {
        self.gates = gates;
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
