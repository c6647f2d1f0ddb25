//! RS485 half-duplex transceiver on UART1.
//!
//! The board's transceiver switches direction automatically, so the
//! driver only writes bytes and waits for the FIFO to drain.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: wraps an `esp_idf_hal::uart::UartDriver`.
//! On host/test: records every frame in memory.

use log::warn;

use crate::error::CommsError;

/// Line rate expected by the off-board Modbus relay modules.
pub const BAUD_RATE: u32 = 9_600;

pub struct Rs485Driver {
    #[cfg(target_os = "espidf")]
    uart: esp_idf_hal::uart::UartDriver<'static>,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<Vec<u8>>,
}

impl Rs485Driver {
    #[cfg(target_os = "espidf")]
    pub fn new(uart: esp_idf_hal::uart::UartDriver<'static>) -> Self {
        Self { uart }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self { sent: Vec::new() }
    }

    /// Write one complete frame.
    #[cfg(target_os = "espidf")]
    pub fn send(&mut self, frame: &[u8]) -> Result<(), CommsError> {
        use esp_idf_hal::delay::BLOCK;

        let written = self.uart.write(frame).map_err(|e| {
            warn!("RS485: write failed: {}", e);
            CommsError::Rs485WriteFailed
        })?;
        if written != frame.len() {
            warn!("RS485: short write {}/{}", written, frame.len());
            return Err(CommsError::Rs485WriteFailed);
        }
        self.uart.wait_tx_done(BLOCK).map_err(|e| {
            warn!("RS485: tx drain failed: {}", e);
            CommsError::Rs485WriteFailed
        })
    }

    /// Write one complete frame.
    #[cfg(not(target_os = "espidf"))]
    pub fn send(&mut self, frame: &[u8]) -> Result<(), CommsError> {
        if frame.is_empty() {
            warn!("RS485(sim): refusing empty frame");
            return Err(CommsError::Rs485WriteFailed);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }

    /// Frames written so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for Rs485Driver {
    fn default() -> Self {
        Self::new()
    }
}
