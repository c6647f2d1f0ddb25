//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Keys and MAC tags never reach this layer: events carry only channel
//! numbers, kinds and reasons.

use log::{info, warn};

use crate::app::commands::Dispatched;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::FrameAccepted { kind, dispatched } => match dispatched {
                Dispatched::Relay { channel } => {
                    info!("ACCEPT | {:?} | relay channel={}", kind, channel);
                }
                Dispatched::Bridge(cmd) => {
                    info!("ACCEPT | {:?} | rs485 selector={}", kind, cmd.selector);
                }
                Dispatched::Schedule(ev) => {
                    info!(
                        "ACCEPT | {:?} | timer {:04}-{:02}-{:02} {:02}:{:02}:{:02} {:?} {:?}",
                        kind,
                        ev.at.year,
                        ev.at.month,
                        ev.at.day,
                        ev.at.hour,
                        ev.at.minute,
                        ev.at.second,
                        ev.action,
                        ev.repetition,
                    );
                }
            },
            AppEvent::FrameRejected { kind, len, reason } => {
                warn!("REJECT | len={} kind={:?} | {}", len, kind, reason);
            }
            AppEvent::ClockTrusted { utc } => {
                info!("CLOCK | trusted, utc={}", utc);
            }
            AppEvent::TimerFired { action } => {
                info!("TIMER | fired {:?}", action);
            }
            AppEvent::Started => {
                info!("START | relay controller up");
            }
        }
    }
}
