//! Outcomes of an accepted frame.
//!
//! Each variant names the collaborator the frame was handed to.

use crate::protocol::bridge::BridgeCommand;
use crate::protocol::schedule::TimerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Authenticated command; `channel` went to the relay port.
    Relay { channel: u8 },

    /// Bridge command forwarded over RS485.
    Bridge(BridgeCommand),

    /// Timer event handed to the scheduler.
    Schedule(TimerEvent),
}
