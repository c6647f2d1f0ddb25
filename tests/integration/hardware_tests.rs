//! HardwareAdapter wired to a mock I²C bus and the simulated RS485 driver.

use super::mock_hw::{CollectSink, FixedClock, MockI2c};

use relaygate::adapters::hardware::HardwareAdapter;
use relaygate::adapters::relay_bank::RelayBank;
use relaygate::adapters::rs485::Rs485Bridge;
use relaygate::app::ports::{BridgePort, RelayPort};
use relaygate::app::service::CommandService;
use relaygate::config::RelayConfig;
use relaygate::drivers::rs485::Rs485Driver;
use relaygate::drivers::tca9554::{DEFAULT_ADDRESS, Tca9554};
use relaygate::protocol::mac::{self, SharedSecret};
use relaygate::scheduler::Scheduler;

const T0: u32 = 0x67B5_A230;

fn adapter(relay_count: u8) -> HardwareAdapter<MockI2c> {
    let expander = Tca9554::new(MockI2c::default(), DEFAULT_ADDRESS).unwrap();
    HardwareAdapter::new(
        RelayBank::new(expander, relay_count),
        Rs485Bridge::new(Rs485Driver::new()),
        Scheduler::new(),
    )
}

#[test]
fn expander_starts_with_every_relay_off() {
    let hw = adapter(8);
    assert_eq!(hw.relays().states(), 0);
}

#[test]
fn group_commands_respect_relay_count() {
    let mut hw = adapter(4);
    hw.actuate(9);
    assert_eq!(hw.relays().states(), 0b0000_1111);
    hw.actuate(0);
    assert_eq!(hw.relays().states(), 0);
}

#[test]
fn out_of_range_channel_is_ignored() {
    let mut hw = adapter(4);
    hw.actuate(2);
    hw.actuate(6);
    hw.actuate(0x42);
    assert_eq!(hw.relays().states(), 0b0000_0010);
}

#[test]
fn bridge_selectors_become_modbus_frames() {
    let mut hw = adapter(8);
    hw.forward(1);
    hw.forward(9);
    hw.forward(200);

    let sent = hw.bridge().driver().sent();
    assert_eq!(sent.len(), 2, "unknown selector must not hit the wire");
    assert_eq!(sent[0], [0x01u8, 0x05, 0x00, 0x00, 0x55, 0x00, 0xF2, 0x9A]);
    assert_eq!(sent[1], [0x01u8, 0x05, 0x00, 0xFF, 0xFF, 0x00, 0xBC, 0x0A]);
}

#[test]
fn authenticated_frames_toggle_real_relay_bank() {
    let secret = SharedSecret::new(b"key-fsa-relay").unwrap();
    let mut svc = CommandService::new(secret.clone(), RelayConfig::default());
    let mut hw = adapter(8);
    let mut sink = CollectSink::new();
    let clock = FixedClock::trusted(T0);

    let on3 = *mac::sign(&secret, 3, T0).as_bytes();
    svc.handle_frame(&on3, &clock, &mut hw, &mut sink).unwrap();
    assert!(hw.relays().is_on(3));

    // Same frame again within the window toggles back.
    svc.handle_frame(&on3, &clock, &mut hw, &mut sink).unwrap();
    assert!(!hw.relays().is_on(3));
}

#[test]
fn bus_failure_does_not_turn_accept_into_reject() {
    let secret = SharedSecret::new(b"key-fsa-relay").unwrap();
    let mut svc = CommandService::new(secret.clone(), RelayConfig::default());
    let mut sink = CollectSink::new();
    let clock = FixedClock::trusted(T0);

    let i2c = MockI2c::default();
    let fail = i2c.fail.clone();
    let expander = Tca9554::new(i2c, DEFAULT_ADDRESS).unwrap();
    let mut hw = HardwareAdapter::new(
        RelayBank::new(expander, 8),
        Rs485Bridge::new(Rs485Driver::new()),
        Scheduler::new(),
    );
    fail.set(true);

    let frame = *mac::sign(&secret, 1, T0).as_bytes();
    assert!(svc.handle_frame(&frame, &clock, &mut hw, &mut sink).is_ok());
    assert_eq!(svc.stats().accepted, 1);
    assert!(!hw.relays().is_on(1), "failed write must not update the latch");
}
