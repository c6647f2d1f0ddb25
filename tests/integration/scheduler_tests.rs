//! Schedule frame → Scheduler → relay bank, driven through the service.

use super::mock_hw::{CollectSink, FixedClock, IoCall, MockI2c, MockIo};

use relaygate::adapters::hardware::HardwareAdapter;
use relaygate::adapters::relay_bank::RelayBank;
use relaygate::adapters::rs485::Rs485Bridge;
use relaygate::app::events::AppEvent;
use relaygate::app::ports::SchedulePort;
use relaygate::app::service::CommandService;
use relaygate::config::RelayConfig;
use relaygate::drivers::rs485::Rs485Driver;
use relaygate::drivers::tca9554::{DEFAULT_ADDRESS, Tca9554};
use relaygate::protocol::mac::SharedSecret;
use relaygate::protocol::schedule::{self, TimerAction};
use relaygate::scheduler::{MAX_TIMERS, Scheduler};

/// 2025-03-01 08:30:00 UTC.
const T_MAR_1: u32 = 1_740_817_800;
const DAY: u32 = 86_400;

/// 2025-03-01 08:30:00 `<channel/state>` with the given flags.
fn frame(target: u8, all: u8, repeat: u8) -> [u8; 14] {
    [
        0xA1, 0x20, 0x25, 0x03, 0x01, 0x06, 0xAA, 0x08, 0x30, 0x00, target, all, repeat, 0xFF,
    ]
}

fn scheduling_service() -> CommandService<RelayConfig> {
    let cfg = RelayConfig {
        scheduling_enabled: true,
        ..RelayConfig::default()
    };
    CommandService::new(SharedSecret::new(b"key-fsa-relay").unwrap(), cfg)
}

fn adapter() -> HardwareAdapter<MockI2c> {
    let expander = Tca9554::new(MockI2c::default(), DEFAULT_ADDRESS).unwrap();
    HardwareAdapter::new(
        RelayBank::new(expander, 8),
        Rs485Bridge::new(Rs485Driver::new()),
        Scheduler::new(),
    )
}

#[test]
fn once_timer_fires_a_single_time() {
    let mut svc = scheduling_service();
    let mut hw = adapter();
    let mut sink = CollectSink::new();

    svc.handle_frame(&frame(0x51, 0, 0), &FixedClock::untrusted(), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(hw.scheduler().len(), 1);

    assert_eq!(hw.tick_scheduler(T_MAR_1 - 1, &mut sink), 0);
    assert!(!hw.relays().is_on(5));

    assert_eq!(hw.tick_scheduler(T_MAR_1, &mut sink), 1);
    assert!(hw.relays().is_on(5));
    assert!(hw.scheduler().is_empty());
    assert_eq!(
        sink.last(),
        Some(&AppEvent::TimerFired {
            action: TimerAction::Single { channel: 5, on: true }
        })
    );
}

#[test]
fn daily_mask_timer_rearms() {
    let mut svc = scheduling_service();
    let mut hw = adapter();
    let mut sink = CollectSink::new();

    svc.handle_frame(&frame(0b1000_0001, 1, 1), &FixedClock::untrusted(), &mut hw, &mut sink)
        .unwrap();

    assert_eq!(hw.tick_scheduler(T_MAR_1, &mut sink), 1);
    assert_eq!(hw.relays().states(), 0b1000_0001);
    assert_eq!(hw.scheduler().next_due(), Some(T_MAR_1 + DAY));

    // Not due again until the next day.
    assert_eq!(hw.tick_scheduler(T_MAR_1 + DAY - 1, &mut sink), 0);
    assert_eq!(hw.tick_scheduler(T_MAR_1 + DAY, &mut sink), 1);
}

#[test]
fn late_first_tick_fires_once_and_skips_missed_days() {
    let mut hw = adapter();
    let mut sink = CollectSink::new();
    hw.program(schedule::parse(&frame(0x21, 0, 1)).unwrap())
        .unwrap();

    let fired = hw.tick_scheduler(T_MAR_1 + 3 * DAY + 60, &mut sink);

    assert_eq!(fired, 1);
    assert_eq!(hw.scheduler().next_due(), Some(T_MAR_1 + 4 * DAY));
}

#[test]
fn table_overflow_is_reported_by_the_port() {
    let mut hw = adapter();
    let event = schedule::parse(&frame(0x11, 0, 1)).unwrap();
    for _ in 0..MAX_TIMERS {
        hw.program(event).unwrap();
    }
    assert!(hw.program(event).is_err());
    assert_eq!(hw.scheduler().len(), MAX_TIMERS);
}

#[test]
fn schedule_frame_reaches_program_verbatim() {
    let mut svc = scheduling_service();
    let mut io = MockIo::new();
    let mut sink = CollectSink::new();
    let raw = frame(0x80, 0, 2);

    svc.handle_frame(&raw, &FixedClock::untrusted(), &mut io, &mut sink)
        .unwrap();

    let expected = schedule::parse(&raw).unwrap();
    assert_eq!(io.last_call(), Some(&IoCall::Program(expected)));
    assert_eq!(expected.action, TimerAction::Single { channel: 8, on: false });
}
