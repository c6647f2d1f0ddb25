//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements    | Connects to                  |
//! |--------------|---------------|------------------------------|
//! | `ble`        | (frame source)| Bluedroid GATT server        |
//! | `hardware`   | RelayPort     | bundles the three below      |
//! |              | BridgePort    |                              |
//! |              | SchedulePort  |                              |
//! | `relay_bank` | RelayPort     | TCA9554 I²C expander         |
//! | `rs485`      | BridgePort    | Modbus RTU over UART1        |
//! | `log_sink`   | EventSink     | Serial log output            |
//! | `nvs`        | ConfigPort    | NVS / in-memory store        |
//! |              | StoragePort   |                              |
//! | `time`       | TimeSource    | SNTP-disciplined wall clock  |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod relay_bank;
pub mod rs485;
pub mod time;
