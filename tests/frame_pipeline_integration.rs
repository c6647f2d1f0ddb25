//! End-to-end: BLE write → CommandService → relay expander, against the
//! simulated clock, BLE ingress and RS485 driver.
//!
//! Mirrors the firmware main loop without any ESP-IDF dependency.

#![cfg(not(target_os = "espidf"))]

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

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
use relaygate::drivers::rs485::Rs485Driver;
use relaygate::drivers::tca9554::{DEFAULT_ADDRESS, Tca9554};
use relaygate::error::RejectReason;
use relaygate::scheduler::Scheduler;

const T0: u32 = 0x67B5_A230;
const KAT_HEX: &[u8] = b"0167B5A2309DB5ACAD536B7A15B53C3922";

#[derive(Default)]
struct AckBus;

impl ErrorType for AckBus {
    type Error = ErrorKind;
}

impl I2c for AckBus {
    fn transaction(&mut self, _address: u8, ops: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        for op in ops {
            if let Operation::Read(buf) = op {
                buf.fill(0);
            }
        }
        Ok(())
    }
}

struct Rig {
    clock: SystemClock,
    ble: BleAdapter,
    hw: HardwareAdapter<AckBus>,
    service: CommandService<RelayConfig>,
    sink: LogEventSink,
}

impl Rig {
    /// Boot exactly as the firmware does: config and secret from NVS.
    fn boot(config: RelayConfig) -> Self {
        let nvs = NvsAdapter::new().unwrap();
        nvs.save(&config).unwrap();
        let config = nvs.load().unwrap();
        let secret = nvs.load_secret().unwrap();

        let expander = Tca9554::new(AckBus, DEFAULT_ADDRESS).unwrap();
        let hw = HardwareAdapter::new(
            RelayBank::new(expander, config.relay_count),
            Rs485Bridge::new(Rs485Driver::new()),
            Scheduler::new(),
        );

        let mut ble = BleAdapter::new(config.device_name.clone());
        ble.start();

        let mut sink = LogEventSink::new();
        let mut service = CommandService::new(secret, config);
        service.start(&mut sink);

        let clock = SystemClock::new();
        clock.set_manual(0);

        Self {
            clock,
            ble,
            hw,
            service,
            sink,
        }
    }

    /// One main-loop iteration; returns the decisions made.
    fn spin(&mut self) -> Vec<Result<(), RejectReason>> {
        if let Some(utc) = self.clock.poll_sync() {
            self.sink.emit(&AppEvent::ClockTrusted { utc });
        }
        let mut out = Vec::new();
        while let Some(frame) = self.ble.next_frame() {
            out.push(
                self.service
                    .handle_frame(&frame, &self.clock, &mut self.hw, &mut self.sink)
                    .map(|_| ()),
            );
        }
        let snapshot = self.clock.snapshot();
        if snapshot.trusted {
            self.hw.tick_scheduler(snapshot.now_utc, &mut self.sink);
        }
        self.ble.update_status(&self.service.stats());
        out
    }
}

#[test]
fn commands_before_sync_are_refused_then_accepted_after() {
    let mut rig = Rig::boot(RelayConfig::default());

    rig.ble.inject_write(KAT_HEX);
    assert_eq!(rig.spin(), vec![Err(RejectReason::ClockUntrusted)]);
    assert!(!rig.hw.relays().is_on(1));

    rig.clock.set_manual(T0 + 10);
    rig.ble.inject_write(KAT_HEX);
    assert_eq!(rig.spin(), vec![Ok(())]);
    assert!(rig.hw.relays().is_on(1));

    assert_eq!(rig.ble.status(), "{\"ok\":1,\"rej\":1,\"drop\":0}");
}

#[test]
fn bridge_frame_goes_out_on_rs485() {
    let mut rig = Rig::boot(RelayConfig {
        extension_enabled: true,
        ..RelayConfig::default()
    });

    rig.ble.inject_write(&[0x06, 0x02]);
    assert_eq!(rig.spin(), vec![Ok(())]);

    let sent = rig.hw.bridge().driver().sent();
    assert_eq!(sent, [vec![0x01u8, 0x05, 0x00, 0x01, 0x55, 0x00, 0xA3, 0x5A]]);
}

#[test]
fn scheduled_relay_switches_once_clock_reaches_it() {
    let mut rig = Rig::boot(RelayConfig {
        scheduling_enabled: true,
        ..RelayConfig::default()
    });

    // 2025-03-01 08:30:00, relay 4 on, once.
    rig.ble.inject_write(&[
        0xA1, 0x20, 0x25, 0x03, 0x01, 0x06, 0xAA, 0x08, 0x30, 0x00, 0x41, 0x00, 0x00, 0xFF,
    ]);
    assert_eq!(rig.spin(), vec![Ok(())]);
    assert_eq!(rig.hw.scheduler().len(), 1);

    rig.clock.set_manual(1_740_817_799);
    rig.spin();
    assert!(!rig.hw.relays().is_on(4));

    rig.clock.set_manual(1_740_817_800);
    rig.spin();
    assert!(rig.hw.relays().is_on(4));
    assert!(rig.hw.scheduler().is_empty());
}

#[test]
fn oversize_write_is_rejected_as_unsupported_length() {
    let mut rig = Rig::boot(RelayConfig::default());
    rig.ble.inject_write(&[0x30; 200]);
    assert_eq!(rig.spin(), vec![Err(RejectReason::UnsupportedLength)]);
}
