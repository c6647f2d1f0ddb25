//! RS485 bridge adapter.
//!
//! Implements [`BridgePort`] by mapping a one-byte selector onto a
//! pre-defined Modbus RTU "write single coil" frame and sending it to
//! the off-board relay module at slave address 1.
//!
//! | Selector | Coil     | Value    | Effect            |
//! |----------|----------|----------|-------------------|
//! | `1..=8`  | `sel-1`  | `0x5500` | toggle that relay |
//! | `9`      | `0x00FF` | `0xFF00` | all relays on     |
//! | `0`      | `0x00FF` | `0x0000` | all relays off    |

use crc::{CRC_16_MODBUS, Crc};
use log::{info, warn};

use crate::app::ports::{BridgeError, BridgePort};
use crate::drivers::rs485::Rs485Driver;

pub const SLAVE_ADDRESS: u8 = 0x01;
pub const FN_WRITE_SINGLE_COIL: u8 = 0x05;

/// Address + function + coil (2) + value (2) + CRC (2).
pub const FRAME_LEN: usize = 8;

const COIL_ALL: u16 = 0x00FF;
const VALUE_TOGGLE: u16 = 0x5500;
const VALUE_ON: u16 = 0xFF00;
const VALUE_OFF: u16 = 0x0000;

/// CRC-16/MODBUS (poly 0x8005 reflected, init 0xFFFF).
const MODBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

pub fn crc16_modbus(data: &[u8]) -> u16 {
    MODBUS_CRC.checksum(data)
}

/// Build the frame for `selector`.
pub fn frame_for(selector: u8) -> Result<[u8; FRAME_LEN], BridgeError> {
    let (coil, value) = match selector {
        1..=8 => (u16::from(selector - 1), VALUE_TOGGLE),
        9 => (COIL_ALL, VALUE_ON),
        0 => (COIL_ALL, VALUE_OFF),
        other => return Err(BridgeError::UnknownSelector(other)),
    };
    let [coil_hi, coil_lo] = coil.to_be_bytes();
    let [value_hi, value_lo] = value.to_be_bytes();

    let mut frame = [
        SLAVE_ADDRESS,
        FN_WRITE_SINGLE_COIL,
        coil_hi,
        coil_lo,
        value_hi,
        value_lo,
        0,
        0,
    ];
    // CRC goes out low byte first.
    let crc = crc16_modbus(&frame[..FRAME_LEN - 2]).to_le_bytes();
    frame[FRAME_LEN - 2..].copy_from_slice(&crc);
    Ok(frame)
}

pub struct Rs485Bridge {
    driver: Rs485Driver,
}

impl Rs485Bridge {
    pub fn new(driver: Rs485Driver) -> Self {
        Self { driver }
    }

    /// Build and send the frame for `selector`.
    pub fn send_selector(&mut self, selector: u8) -> Result<(), BridgeError> {
        let frame = frame_for(selector)?;
        self.driver
            .send(&frame)
            .map_err(|_| BridgeError::WriteFailed)?;
        info!("RS485: selector {} sent", selector);
        Ok(())
    }

    pub fn driver(&self) -> &Rs485Driver {
        &self.driver
    }
}

impl BridgePort for Rs485Bridge {
    fn forward(&mut self, selector: u8) {
        if let Err(e) = self.send_selector(selector) {
            warn!("RS485: {}", e);
        }
    }
}
