//! Mock collaborators for integration tests.
//!
//! Records every port call so tests can assert on the full dispatch
//! history without touching the I²C bus, the UART, or a real clock.

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use relaygate::app::events::AppEvent;
use relaygate::app::ports::{
    BridgePort, EventSink, RelayPort, SchedulePort, SchedulerError, TimeSource,
};
use relaygate::protocol::schedule::TimerEvent;

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum IoCall {
    Actuate(u8),
    SetChannel { channel: u8, on: bool },
    SetMask(u8),
    Forward(u8),
    Program(TimerEvent),
}

// ── MockIo ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockIo {
    pub calls: Vec<IoCall>,
    /// When set, `program` reports a full timer table.
    pub schedule_full: bool,
}

#[allow(dead_code)]
impl MockIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_call(&self) -> Option<&IoCall> {
        self.calls.last()
    }
}

impl RelayPort for MockIo {
    fn actuate(&mut self, channel: u8) {
        self.calls.push(IoCall::Actuate(channel));
    }

    fn set_channel(&mut self, channel: u8, on: bool) {
        self.calls.push(IoCall::SetChannel { channel, on });
    }

    fn set_mask(&mut self, mask: u8) {
        self.calls.push(IoCall::SetMask(mask));
    }
}

impl BridgePort for MockIo {
    fn forward(&mut self, selector: u8) {
        self.calls.push(IoCall::Forward(selector));
    }
}

impl SchedulePort for MockIo {
    fn program(&mut self, event: TimerEvent) -> Result<(), SchedulerError> {
        self.calls.push(IoCall::Program(event));
        if self.schedule_full {
            Err(SchedulerError::Full)
        } else {
            Ok(())
        }
    }
}

// ── FixedClock ────────────────────────────────────────────────

/// A clock frozen at `now`; counts how often it is consulted.
pub struct FixedClock {
    pub trusted: bool,
    pub now: u32,
    reads: Cell<u32>,
}

#[allow(dead_code)]
impl FixedClock {
    pub fn trusted(now: u32) -> Self {
        Self {
            trusted: true,
            now,
            reads: Cell::new(0),
        }
    }

    pub fn untrusted() -> Self {
        Self {
            trusted: false,
            now: 0,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl TimeSource for FixedClock {
    fn is_time_trustworthy(&self) -> bool {
        self.trusted
    }

    fn current_utc_seconds(&self) -> u32 {
        self.reads.set(self.reads.get() + 1);
        self.now
    }
}

// ── CollectSink ───────────────────────────────────────────────

#[derive(Default)]
pub struct CollectSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockI2c ───────────────────────────────────────────────────

/// I²C bus that acknowledges every write and keeps a copy.
///
/// `fail` is shared so a test can break the bus after the driver owns it.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub fail: Rc<Cell<bool>>,
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(ErrorKind::Other);
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => buf.fill(0),
            }
        }
        Ok(())
    }
}
