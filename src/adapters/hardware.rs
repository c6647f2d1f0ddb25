//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the relay bank, the RS485 bridge and the timer table, exposing
//! them through [`RelayPort`], [`BridgePort`] and [`SchedulePort`].
//! The command service receives this one value as its `io` argument.

use embedded_hal::i2c::I2c;

use crate::app::ports::{BridgePort, EventSink, RelayPort, SchedulePort, SchedulerError};
use crate::protocol::schedule::TimerEvent;
use crate::scheduler::Scheduler;

use super::relay_bank::RelayBank;
use super::rs485::Rs485Bridge;

/// Concrete adapter that combines all outputs behind port traits.
pub struct HardwareAdapter<I> {
    relays: RelayBank<I>,
    bridge: Rs485Bridge,
    scheduler: Scheduler,
}

impl<I: I2c> HardwareAdapter<I> {
    pub fn new(relays: RelayBank<I>, bridge: Rs485Bridge, scheduler: Scheduler) -> Self {
        Self {
            relays,
            bridge,
            scheduler,
        }
    }

    /// Fire due timers against the relay bank.  Call only with a trusted `now`.
    pub fn tick_scheduler(&mut self, now: u32, sink: &mut impl EventSink) -> usize {
        self.scheduler.tick(now, &mut self.relays, sink)
    }

    pub fn relays(&self) -> &RelayBank<I> {
        &self.relays
    }

    pub fn bridge(&self) -> &Rs485Bridge {
        &self.bridge
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

// ── RelayPort implementation ──────────────────────────────────

impl<I: I2c> RelayPort for HardwareAdapter<I> {
    fn actuate(&mut self, channel: u8) {
        self.relays.actuate(channel);
    }

    fn set_channel(&mut self, channel: u8, on: bool) {
        self.relays.set_channel(channel, on);
    }

    fn set_mask(&mut self, mask: u8) {
        self.relays.set_mask(mask);
    }
}

// ── BridgePort implementation ─────────────────────────────────

impl<I: I2c> BridgePort for HardwareAdapter<I> {
    fn forward(&mut self, selector: u8) {
        self.bridge.forward(selector);
    }
}

// ── SchedulePort implementation ───────────────────────────────

impl<I: I2c> SchedulePort for HardwareAdapter<I> {
    fn program(&mut self, event: TimerEvent) -> Result<(), SchedulerError> {
        self.scheduler.program(event)
    }
}
