//! RelayGate firmware entry point.
//!
//! Hexagonal architecture around a single-threaded command loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleAdapter        HardwareAdapter          SystemClock        │
//! │  (frame source)    (Relay+Bridge+Schedule)  (TimeSource)       │
//! │  NvsAdapter        LogEventSink                                │
//! │  (Config+Secret)   (EventSink)                                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           CommandService (pure logic)                  │    │
//! │  │  classify · normalize · freshness · MAC · dispatch     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (ticked only while the clock is trusted)            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use relaygate::adapters::ble::BleAdapter;
use relaygate::adapters::hardware::HardwareAdapter;
use relaygate::adapters::log_sink::LogEventSink;
use relaygate::adapters::nvs::NvsAdapter;
use relaygate::adapters::relay_bank::RelayBank;
use relaygate::adapters::rs485::Rs485Bridge;
use relaygate::adapters::time::SystemClock;
use relaygate::app::events::AppEvent;
use relaygate::app::ports::{ConfigPort, EventSink, TimeSource};
use relaygate::app::service::CommandService;
use relaygate::config::RelayConfig;
use relaygate::drivers::rs485::{BAUD_RATE, Rs485Driver};
use relaygate::drivers::tca9554::{DEFAULT_ADDRESS, Tca9554};
use relaygate::pins;
use relaygate::scheduler::Scheduler;

/// Main loop period.
const LOOP_PERIOD_MS: u32 = 10;
/// Status characteristic refresh, in loop iterations (~5 s).
const STATUS_EVERY: u32 = 500;

// ── Network ───────────────────────────────────────────────────
//
// SNTP needs an uplink.  Credentials come from the build environment;
// without them the clock never becomes trusted and only unauthenticated
// relay frames are honoured.

fn connect_wifi(
    modem: esp_idf_hal::modem::Modem,
    sysloop: EspSystemEventLoop,
) -> Result<Option<BlockingWifi<EspWifi<'static>>>> {
    let (Some(ssid), Some(password)) = (
        option_env!("RELAYGATE_WIFI_SSID"),
        option_env!("RELAYGATE_WIFI_PASS"),
    ) else {
        warn!("WiFi: no build credentials, clock will stay untrusted");
        return Ok(None);
    };

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), None)?, sysloop)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("WiFi SSID too long"))?,
        password: password
            .try_into()
            .map_err(|_| anyhow!("WiFi password too long"))?,
        auth_method: if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("WiFi: connecting to '{}'", ssid);
    if let Err(e) = wifi.connect().and_then(|()| wifi.wait_netif_up()) {
        // Keep running; BLE relay control does not depend on the uplink.
        warn!("WiFi: connect failed ({}), clock will stay untrusted", e);
    }
    Ok(Some(wifi))
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayGate v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Load config + secret from NVS ──────────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            RelayConfig::default()
        }
    };
    let secret = nvs
        .load_secret()
        .map_err(|e| anyhow!("command secret unavailable: {}", e))?;

    // ── 3. Relay expander (I²C) ───────────────────────────────
    // SAFETY: these GPIOs are claimed nowhere else in the firmware.
    let (sda, scl) = unsafe {
        (
            AnyIOPin::new(pins::I2C_SDA_GPIO),
            AnyIOPin::new(pins::I2C_SCL_GPIO),
        )
    };
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let expander = Tca9554::new(i2c, DEFAULT_ADDRESS)
        .map_err(|e| anyhow!("TCA9554 init failed: {:?}", e))?;
    let relays = RelayBank::new(expander, config.relay_count);

    // ── 4. RS485 bridge (UART1) ───────────────────────────────
    // SAFETY: as above.
    let (tx, rx) = unsafe {
        (
            AnyIOPin::new(pins::RS485_TX_GPIO),
            AnyIOPin::new(pins::RS485_RX_GPIO),
        )
    };
    let uart = UartDriver::new(
        peripherals.uart1,
        tx,
        rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(BAUD_RATE)),
    )?;
    let bridge = Rs485Bridge::new(Rs485Driver::new(uart));

    let mut hw = HardwareAdapter::new(relays, bridge, Scheduler::new());
    let mut log_sink = LogEventSink::new();

    // ── 5. Time: uplink + SNTP ────────────────────────────────
    let clock = SystemClock::new();
    let _wifi = connect_wifi(peripherals.modem, sysloop)?;
    let _sntp = EspSntp::new_default()?;

    // ── 6. BLE frame ingress ──────────────────────────────────
    let mut ble = BleAdapter::new(config.device_name.clone());
    ble.start();

    // ── 7. Command service ────────────────────────────────────
    let mut service = CommandService::new(secret, config);
    service.start(&mut log_sink);

    info!("System ready. Entering command loop.");

    // ── 8. Command loop ───────────────────────────────────────
    let mut status_counter: u32 = 0;

    loop {
        if let Some(utc) = clock.poll_sync() {
            log_sink.emit(&AppEvent::ClockTrusted { utc });
        }

        while let Some(frame) = ble.next_frame() {
            // Outcome already reported through the sink.
            let _ = service.handle_frame(&frame, &clock, &mut hw, &mut log_sink);
        }

        let snapshot = clock.snapshot();
        if snapshot.trusted {
            hw.tick_scheduler(snapshot.now_utc, &mut log_sink);
        }

        status_counter += 1;
        if status_counter >= STATUS_EVERY {
            ble.update_status(&service.stats());
            status_counter = 0;
        }

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
