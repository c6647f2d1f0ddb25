//! TCA9554 8-bit I²C GPIO expander driving the relay coils.
//!
//! All eight pins are configured as outputs; bit `n` drives relay `n + 1`.
//! The driver caches the output latch so toggles need no read-back.
//!
//! ## Dual-target design
//!
//! Generic over [`embedded_hal::i2c::I2c`]: on ESP-IDF the bus is an
//! `esp_idf_hal::i2c::I2cDriver`; on host/test a mock bus records writes.

use embedded_hal::i2c::I2c;
use log::{debug, info};

/// 7-bit address with A0..A2 tied low.
pub const DEFAULT_ADDRESS: u8 = 0x20;

const REG_OUTPUT: u8 = 0x01;
const REG_CONFIG: u8 = 0x03;

pub struct Tca9554<I> {
    i2c: I,
    address: u8,
    outputs: u8,
}

impl<I: I2c> Tca9554<I> {
    /// Configure every pin as an output, all driven low.
    pub fn new(i2c: I, address: u8) -> Result<Self, I::Error> {
        let mut dev = Self {
            i2c,
            address,
            outputs: 0,
        };
        // Latch before direction so no relay glitches on at power-up.
        dev.i2c.write(address, &[REG_OUTPUT, 0x00])?;
        dev.i2c.write(address, &[REG_CONFIG, 0x00])?;
        info!("TCA9554 @0x{:02X}: all outputs low", address);
        Ok(dev)
    }

    /// Drive all eight outputs at once.
    pub fn write_outputs(&mut self, mask: u8) -> Result<(), I::Error> {
        self.i2c.write(self.address, &[REG_OUTPUT, mask])?;
        self.outputs = mask;
        debug!("TCA9554: outputs=0b{:08b}", mask);
        Ok(())
    }

    /// Set or clear one pin (0..=7).
    pub fn set_pin(&mut self, pin: u8, high: bool) -> Result<(), I::Error> {
        let bit = 1u8 << (pin & 0x07);
        let mask = if high {
            self.outputs | bit
        } else {
            self.outputs & !bit
        };
        self.write_outputs(mask)
    }

    /// Flip one pin (0..=7).
    pub fn toggle_pin(&mut self, pin: u8) -> Result<(), I::Error> {
        self.write_outputs(self.outputs ^ (1u8 << (pin & 0x07)))
    }

    /// Last latched output mask.
    pub fn outputs(&self) -> u8 {
        self.outputs
    }

    /// Release the bus.
    pub fn release(self) -> I {
        self.i2c
    }
}
