//! Peripheral drivers for the relay board.

pub mod rs485;
pub mod tca9554;
