//! Outbound application events.
//!
//! Emitted through the [`EventSink`](super::ports::EventSink) port.
//! Surfacing (serial log, counters, BLE status) is the adapter's job.

use crate::error::RejectReason;
use crate::protocol::classify::FrameKind;
use crate::protocol::schedule::TimerAction;

use super::commands::Dispatched;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The firmware finished bootstrapping.
    Started,

    /// The external clock synchronised for the first time.
    ClockTrusted { utc: u32 },

    /// A frame passed every check and was handed to a collaborator.
    FrameAccepted { kind: FrameKind, dispatched: Dispatched },

    /// A frame was refused; no collaborator was invoked.
    FrameRejected {
        /// `None` when the length matched no family.
        kind: Option<FrameKind>,
        len: usize,
        reason: RejectReason,
    },

    /// A programmed timer fired.
    TimerFired { action: TimerAction },
}
