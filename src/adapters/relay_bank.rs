//! Relay bank adapter.
//!
//! Implements [`RelayPort`] over the TCA9554 expander.  Channel numbers
//! on the wire are 1-based; expander pins are 0-based.
//!
//! | `actuate(ch)` | Effect                 |
//! |---------------|------------------------|
//! | `1..=count`   | toggle relay `ch`      |
//! | `9`           | every relay on         |
//! | `0`           | every relay off        |
//! | anything else | ignored, logged        |

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::RelayPort;
use crate::config::MAX_RELAYS;
use crate::drivers::tca9554::Tca9554;
use crate::error::ActuatorError;

/// Channel value meaning "all relays on".
pub const CHANNEL_ALL_ON: u8 = 9;
/// Channel value meaning "all relays off".
pub const CHANNEL_ALL_OFF: u8 = 0;

pub struct RelayBank<I> {
    expander: Tca9554<I>,
    relay_count: u8,
}

impl<I: I2c> RelayBank<I> {
    pub fn new(expander: Tca9554<I>, relay_count: u8) -> Self {
        Self {
            expander,
            relay_count: relay_count.clamp(1, MAX_RELAYS),
        }
    }

    /// Bit mask covering every populated relay.
    fn populated(&self) -> u8 {
        (0xFFu16 >> (8 - self.relay_count)) as u8
    }

    fn check_channel(&self, channel: u8) -> Result<u8, ActuatorError> {
        if (1..=self.relay_count).contains(&channel) {
            Ok(channel - 1)
        } else {
            Err(ActuatorError::InvalidChannel(channel))
        }
    }

    /// Apply an authenticated channel command.
    pub fn try_actuate(&mut self, channel: u8) -> Result<(), ActuatorError> {
        let result = match channel {
            CHANNEL_ALL_OFF => self.expander.write_outputs(0),
            CHANNEL_ALL_ON => self.expander.write_outputs(self.populated()),
            ch => {
                let pin = self.check_channel(ch)?;
                self.expander.toggle_pin(pin)
            }
        };
        result.map_err(|_| ActuatorError::BusWriteFailed)?;
        info!("Relays: channel {} -> 0b{:08b}", channel, self.states());
        Ok(())
    }

    pub fn try_set_channel(&mut self, channel: u8, on: bool) -> Result<(), ActuatorError> {
        let pin = self.check_channel(channel)?;
        self.expander
            .set_pin(pin, on)
            .map_err(|_| ActuatorError::BusWriteFailed)
    }

    pub fn try_set_mask(&mut self, mask: u8) -> Result<(), ActuatorError> {
        self.expander
            .write_outputs(mask & self.populated())
            .map_err(|_| ActuatorError::BusWriteFailed)
    }

    /// Current relay states, bit 0 = relay 1.
    pub fn states(&self) -> u8 {
        self.expander.outputs()
    }

    pub fn is_on(&self, channel: u8) -> bool {
        self.check_channel(channel)
            .is_ok_and(|pin| self.states() & (1 << pin) != 0)
    }
}

impl<I: I2c> RelayPort for RelayBank<I> {
    fn actuate(&mut self, channel: u8) {
        if let Err(e) = self.try_actuate(channel) {
            warn!("Relays: actuate({}) failed: {}", channel, e);
        }
    }

    fn set_channel(&mut self, channel: u8, on: bool) {
        if let Err(e) = self.try_set_channel(channel, on) {
            warn!("Relays: set_channel({}, {}) failed: {}", channel, on, e);
        }
    }

    fn set_mask(&mut self, mask: u8) {
        if let Err(e) = self.try_set_mask(mask) {
            warn!("Relays: set_mask(0b{:08b}) failed: {}", mask, e);
        }
    }
}
