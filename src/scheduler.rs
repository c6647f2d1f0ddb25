//! Timer table for scheduled relay actions.
//!
//! Events arrive as 14-byte schedule frames (see
//! [`crate::protocol::schedule`]) and are programmed through the
//! [`SchedulePort`].  The main loop calls [`Scheduler::tick`] with the
//! current UTC time once the clock is trusted.
//!
//! ```text
//!  schedule frame ──▶ SchedulePort::program ──▶ ┌───────────────────┐
//!                                               │  Scheduler        │
//!  main loop (trusted clock) ──▶ tick(now) ───▶ │  ≤ 16 timers      │
//!                                               └────────┬──────────┘
//!                                                        │ due?
//!                                                        ▼
//!                                     RelayPort::set_channel / set_mask
//!                                     then re-arm (daily/weekly/monthly)
//!                                     or drop (once)
//! ```

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, RelayPort, SchedulePort, SchedulerError};
use crate::clock::{DateTime, days_in_month};
use crate::protocol::schedule::{Repetition, TimerAction, TimerEvent};

// ═══════════════════════════════════════════════════════════════
//  Timer entries
// ═══════════════════════════════════════════════════════════════

/// Maximum number of programmed timers (stack-allocated).
pub const MAX_TIMERS: usize = 16;

const SECS_PER_DAY: u32 = 86_400;
const SECS_PER_WEEK: u32 = 7 * SECS_PER_DAY;

/// Internal bookkeeping for a live timer.
#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    event: TimerEvent,
    /// UTC seconds of the next firing.
    next_fire: u32,
}

impl TimerEntry {
    /// Move `next_fire` past `now`.  Returns `false` when the timer is
    /// finished (one-shot, or no later occurrence fits in `u32`).
    fn rearm(&mut self, now: u32) -> bool {
        match self.event.repetition {
            Repetition::Once => false,
            Repetition::Daily => self.advance_by(SECS_PER_DAY, now),
            Repetition::Weekly => self.advance_by(SECS_PER_WEEK, now),
            Repetition::Monthly => self.advance_monthly(now),
        }
    }

    fn advance_by(&mut self, period: u32, now: u32) -> bool {
        // Skip every occurrence missed while the device was off.
        let periods = (now - self.next_fire) / period + 1;
        match periods
            .checked_mul(period)
            .and_then(|d| self.next_fire.checked_add(d))
        {
            Some(next) => {
                self.next_fire = next;
                true
            }
            None => false,
        }
    }

    fn advance_monthly(&mut self, now: u32) -> bool {
        let anchor = self.event.at;
        let mut current = DateTime::from_utc_seconds(self.next_fire);
        while self.next_fire <= now {
            let Some(next) = next_monthly(&anchor, current.year, current.month) else {
                return false;
            };
            let Some(secs) = next.to_utc_seconds() else {
                return false;
            };
            self.next_fire = secs;
            current = next;
        }
        true
    }
}

/// First month after `year`/`month` that has the anchor's day-of-month.
fn next_monthly(anchor: &DateTime, mut year: u16, mut month: u8) -> Option<DateTime> {
    // Any day 1..=31 recurs within twelve months.
    for _ in 0..12 {
        if month == 12 {
            year = year.checked_add(1)?;
            month = 1;
        } else {
            month += 1;
        }
        if anchor.day <= days_in_month(year, month) {
            let candidate = DateTime {
                year,
                month,
                weekday: 0,
                ..*anchor
            };
            let secs = candidate.to_utc_seconds()?;
            return Some(DateTime::from_utc_seconds(secs));
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The scheduler engine.
///
/// Decoupled from the transport: it knows nothing about frames, only
/// about [`TimerEvent`]s and the [`RelayPort`] it drives when they fire.
pub struct Scheduler {
    timers: heapless::Vec<TimerEntry, MAX_TIMERS>,
    /// Global enable flag.
    enabled: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            timers: heapless::Vec::new(),
            enabled: true,
        }
    }

    /// Enable or disable firing.  Programmed timers are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Drop every programmed timer.
    pub fn clear(&mut self) {
        self.timers.clear();
        info!("Scheduler: cleared");
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// UTC seconds of the earliest pending firing.
    pub fn next_due(&self) -> Option<u32> {
        self.timers.iter().map(|t| t.next_fire).min()
    }

    /// Fire every timer due at `now`.  Returns how many fired.
    ///
    /// Call only with a trusted clock; an unsynchronised `now` would
    /// fire (or skip) timers against the wrong wall time.
    pub fn tick(
        &mut self,
        now: u32,
        relays: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> usize {
        if !self.enabled {
            return 0;
        }

        let mut fired = 0;
        let mut i = 0;
        while i < self.timers.len() {
            let entry = &mut self.timers[i];
            if entry.next_fire > now {
                i += 1;
                continue;
            }

            let action = entry.event.action;
            match action {
                TimerAction::Single { channel, on } => relays.set_channel(channel, on),
                TimerAction::All { mask } => relays.set_mask(mask),
            }
            sink.emit(&AppEvent::TimerFired { action });
            fired += 1;

            if entry.rearm(now) {
                info!("Scheduler: slot {} re-armed for {}", i, entry.next_fire);
                i += 1;
            } else {
                info!("Scheduler: slot {} finished", i);
                self.timers.swap_remove(i);
            }
        }
        fired
    }
}

impl SchedulePort for Scheduler {
    fn program(&mut self, event: TimerEvent) -> Result<(), SchedulerError> {
        let next_fire = event
            .at
            .to_utc_seconds()
            .ok_or(SchedulerError::Unrepresentable)?;
        self.timers
            .push(TimerEntry { event, next_fire })
            .map_err(|_| {
                warn!("Scheduler: table full ({} timers)", MAX_TIMERS);
                SchedulerError::Full
            })?;
        info!(
            "Scheduler: programmed {:?} {:?} at {}",
            event.action, event.repetition, next_fire
        );
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
