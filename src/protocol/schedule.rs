//! RTC scheduling command (14 bytes, unauthenticated).
//!
//! ```text
//! [0]  0xA1 start            [7]  hour   (BCD)
//! [1]  year century (BCD)    [8]  minute (BCD)
//! [2]  year (BCD)            [9]  second (BCD)
//! [3]  month (BCD)           [10] channel << 4 | state   (or mask)
//! [4]  day (BCD)             [11] apply-to-all flag
//! [5]  day-of-week (BCD)     [12] repetition mode
//! [6]  0xAA separator        [13] 0xFF end
//! ```

use serde::{Deserialize, Serialize};

use crate::clock::{DateTime, bcd_to_bin};
use crate::error::RejectReason;

use super::classify::SCHEDULE_FRAME_LEN;

pub const SCHEDULE_START: u8 = 0xA1;
pub const SCHEDULE_SEPARATOR: u8 = 0xAA;
pub const SCHEDULE_END: u8 = 0xFF;

/// Highest relay channel on the board.
pub const MAX_CHANNEL: u8 = 8;

/// What a timer event does to the relays when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    /// Drive one relay to a fixed state.
    Single { channel: u8, on: bool },
    /// Drive every relay from a bitmask (bit 0 = relay 1).
    All { mask: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repetition {
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl Repetition {
    fn from_wire(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Once),
            1 => Some(Self::Daily),
            2 => Some(Self::Weekly),
            3 => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEvent {
    pub at: DateTime,
    pub action: TimerAction,
    pub repetition: Repetition,
}

pub fn parse(raw: &[u8; SCHEDULE_FRAME_LEN]) -> Result<TimerEvent, RejectReason> {
    if raw[0] != SCHEDULE_START || raw[6] != SCHEDULE_SEPARATOR || raw[13] != SCHEDULE_END {
        return Err(RejectReason::MalformedPayload);
    }

    let bcd = |i: usize| bcd_to_bin(raw[i]).ok_or(RejectReason::MalformedPayload);
    let at = DateTime {
        year: u16::from(bcd(1)?) * 100 + u16::from(bcd(2)?),
        month: bcd(3)?,
        day: bcd(4)?,
        weekday: bcd(5)?,
        hour: bcd(7)?,
        minute: bcd(8)?,
        second: bcd(9)?,
    };
    // The timer table runs on epoch seconds; dates it cannot hold are malformed.
    if at.to_utc_seconds().is_none() {
        return Err(RejectReason::MalformedPayload);
    }

    let action = if raw[11] != 0 {
        TimerAction::All { mask: raw[10] }
    } else {
        let channel = raw[10] >> 4;
        if !(1..=MAX_CHANNEL).contains(&channel) {
            return Err(RejectReason::MalformedPayload);
        }
        TimerAction::Single {
            channel,
            on: raw[10] & 0x0F != 0,
        }
    };

    let repetition = Repetition::from_wire(raw[12]).ok_or(RejectReason::MalformedPayload)?;

    Ok(TimerEvent {
        at,
        action,
        repetition,
    })
}
