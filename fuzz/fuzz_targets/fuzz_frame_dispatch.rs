//! Fuzz target: `CommandService::handle_frame`
//!
//! The first input byte picks the feature gates and clock trust; the rest
//! is the frame as a central would write it.  Asserts that a rejected frame
//! never reaches a collaborator and an accepted one reaches exactly one.
//!
//! cargo fuzz run fuzz_frame_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaygate::app::events::AppEvent;
use relaygate::app::ports::{
    BridgePort, EventSink, RelayPort, SchedulePort, SchedulerError, TimeSource,
};
use relaygate::app::service::CommandService;
use relaygate::config::RelayConfig;
use relaygate::protocol::mac::SharedSecret;
use relaygate::protocol::schedule::TimerEvent;

#[derive(Default)]
struct CountingIo {
    calls: usize,
}

impl RelayPort for CountingIo {
    fn actuate(&mut self, _channel: u8) {
        self.calls += 1;
    }
    fn set_channel(&mut self, _channel: u8, _on: bool) {
        self.calls += 1;
    }
    fn set_mask(&mut self, _mask: u8) {
        self.calls += 1;
    }
}

impl BridgePort for CountingIo {
    fn forward(&mut self, _selector: u8) {
        self.calls += 1;
    }
}

impl SchedulePort for CountingIo {
    fn program(&mut self, _event: TimerEvent) -> Result<(), SchedulerError> {
        self.calls += 1;
        Ok(())
    }
}

struct Clock(bool);

impl TimeSource for Clock {
    fn is_time_trustworthy(&self) -> bool {
        self.0
    }
    fn current_utc_seconds(&self) -> u32 {
        0x67B5_A230
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&flags, frame)) = data.split_first() else {
        return;
    };
    let config = RelayConfig {
        extension_enabled: flags & 0x01 != 0,
        scheduling_enabled: flags & 0x02 != 0,
        ..RelayConfig::default()
    };
    let secret = SharedSecret::new(b"key-fsa-relay").unwrap();
    let mut service = CommandService::new(secret, config);
    let mut io = CountingIo::default();

    match service.handle_frame(frame, &Clock(flags & 0x04 != 0), &mut io, &mut NullSink) {
        Ok(_) => assert_eq!(io.calls, 1, "accepted frame must dispatch once"),
        Err(_) => assert_eq!(io.calls, 0, "rejected frame must not dispatch"),
    }
    let stats = service.stats();
    assert_eq!(stats.accepted + stats.rejected, 1);
});
