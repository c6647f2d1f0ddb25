//! GPIO / peripheral pin assignments for the 8-channel relay board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// I²C bus (TCA9554 relay expander)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 42;
pub const I2C_SCL_GPIO: i32 = 41;
/// Standard-mode clock; the expander tolerates up to 400 kHz.
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// RS485 transceiver (UART1, auto-direction)
// ---------------------------------------------------------------------------

pub const RS485_TX_GPIO: i32 = 17;
pub const RS485_RX_GPIO: i32 = 18;
