//! Integration tests for the CommandService → ports pipeline.
//!
//! Frames go in as raw bytes exactly as a BLE central would write them;
//! assertions are made on the recorded port calls and emitted events.

use super::mock_hw::{CollectSink, FixedClock, IoCall, MockIo};

use relaygate::app::commands::Dispatched;
use relaygate::app::events::AppEvent;
use relaygate::app::service::CommandService;
use relaygate::config::RelayConfig;
use relaygate::error::RejectReason;
use relaygate::protocol::classify::FrameKind;
use relaygate::protocol::mac::{self, SharedSecret};
use relaygate::protocol::schedule::{Repetition, TimerAction};

/// 2025-02-19 09:19:44 UTC.
const T0: u32 = 0x67B5_A230;

/// Channel 1 at `T0`, signed with `key-fsa-relay`.
const KAT_BINARY: [u8; 17] = [
    0x01, 0x67, 0xB5, 0xA2, 0x30, 0x9D, 0xB5, 0xAC, 0xAD, 0x53, 0x6B, 0x7A, 0x15, 0xB5, 0x3C, 0x39,
    0x22,
];
const KAT_HEX: &[u8; 34] = b"0167B5A2309DB5ACAD536B7A15B53C3922";

/// 2025-03-01 08:30:00, relay 3 on, daily.
const SCHEDULE_FRAME: [u8; 14] = [
    0xA1, 0x20, 0x25, 0x03, 0x01, 0x06, 0xAA, 0x08, 0x30, 0x00, 0x31, 0x00, 0x01, 0xFF,
];

fn secret() -> SharedSecret {
    SharedSecret::new(b"key-fsa-relay").unwrap()
}

fn config(extension: bool, scheduling: bool) -> RelayConfig {
    RelayConfig {
        extension_enabled: extension,
        scheduling_enabled: scheduling,
        ..RelayConfig::default()
    }
}

fn make_service(cfg: RelayConfig) -> (CommandService<RelayConfig>, MockIo, CollectSink) {
    let mut svc = CommandService::new(secret(), cfg);
    let mut sink = CollectSink::new();
    svc.start(&mut sink);
    (svc, MockIo::new(), sink)
}

// ── Authenticated frames ──────────────────────────────────────

#[test]
fn known_binary_frame_actuates_channel_one() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let clock = FixedClock::trusted(T0);

    let out = svc.handle_frame(&KAT_BINARY, &clock, &mut io, &mut sink);

    assert_eq!(out, Ok(Dispatched::Relay { channel: 1 }));
    assert_eq!(io.calls, vec![IoCall::Actuate(1)]);
    assert_eq!(
        sink.last(),
        Some(&AppEvent::FrameAccepted {
            kind: FrameKind::AuthBinary,
            dispatched: Dispatched::Relay { channel: 1 },
        })
    );
}

#[test]
fn hex_and_binary_encodings_decide_identically() {
    for now in [T0 - 121, T0 - 120, T0, T0 + 120, T0 + 121] {
        let clock = FixedClock::trusted(now);
        let (mut a, mut io_a, mut sink_a) = make_service(RelayConfig::default());
        let (mut b, mut io_b, mut sink_b) = make_service(RelayConfig::default());

        let bin = a.handle_frame(&KAT_BINARY, &clock, &mut io_a, &mut sink_a);
        let hex = b.handle_frame(KAT_HEX, &clock, &mut io_b, &mut sink_b);

        assert_eq!(bin, hex, "now={now}");
        assert_eq!(io_a.calls, io_b.calls, "now={now}");
    }
}

#[test]
fn lowercase_hex_is_accepted() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let lower = KAT_HEX.to_ascii_lowercase();
    let out = svc.handle_frame(&lower, &FixedClock::trusted(T0 + 60), &mut io, &mut sink);
    assert_eq!(out, Ok(Dispatched::Relay { channel: 1 }));
}

#[test]
fn freshness_window_is_inclusive_at_120_seconds() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());

    for now in [T0 - 120, T0 + 120] {
        assert!(
            svc.handle_frame(&KAT_BINARY, &FixedClock::trusted(now), &mut io, &mut sink)
                .is_ok()
        );
    }
    for now in [T0 - 121, T0 + 121] {
        assert_eq!(
            svc.handle_frame(&KAT_BINARY, &FixedClock::trusted(now), &mut io, &mut sink),
            Err(RejectReason::StaleOrFutureCommand)
        );
    }
    assert_eq!(io.calls.len(), 2);
}

#[test]
fn untrusted_clock_rejects_before_freshness() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let out = svc.handle_frame(&KAT_BINARY, &FixedClock::untrusted(), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::ClockUntrusted));
    assert!(io.calls.is_empty());
}

#[test]
fn any_flipped_bit_fails_authentication() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let clock = FixedClock::trusted(T0);

    // Channel and tag bytes only; the time bytes would also move the
    // freshness check.
    for byte in (0..1).chain(5..17) {
        for bit in 0..8 {
            let mut frame = KAT_BINARY;
            frame[byte] ^= 1 << bit;
            assert_eq!(
                svc.handle_frame(&frame, &clock, &mut io, &mut sink),
                Err(RejectReason::AuthenticationFailed),
                "byte={byte} bit={bit}"
            );
        }
    }
    assert!(io.calls.is_empty());
    assert_eq!(svc.stats().rejected_for(RejectReason::AuthenticationFailed), 13 * 8);
}

#[test]
fn replay_within_window_is_accepted_again() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let clock = FixedClock::trusted(T0 + 5);

    svc.handle_frame(&KAT_BINARY, &clock, &mut io, &mut sink).unwrap();
    svc.handle_frame(&KAT_BINARY, &clock, &mut io, &mut sink).unwrap();

    assert_eq!(io.calls, vec![IoCall::Actuate(1), IoCall::Actuate(1)]);
}

#[test]
fn invalid_hex_is_malformed() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let clock = FixedClock::trusted(T0);
    let mut frame = *KAT_HEX;
    frame[7] = b'G';

    let out = svc.handle_frame(&frame, &clock, &mut io, &mut sink);

    assert_eq!(out, Err(RejectReason::MalformedPayload));
    assert!(io.calls.is_empty());
}

#[test]
fn signed_group_commands_reach_the_relay_port() {
    let (mut svc, mut io, mut sink) = make_service(RelayConfig::default());
    let clock = FixedClock::trusted(T0);

    for channel in [0u8, 9] {
        let frame = *mac::sign(&secret(), channel, T0).as_bytes();
        assert_eq!(
            svc.handle_frame(&frame, &clock, &mut io, &mut sink),
            Ok(Dispatched::Relay { channel })
        );
    }
    assert_eq!(io.calls, vec![IoCall::Actuate(0), IoCall::Actuate(9)]);
}

// ── Bridge frames ─────────────────────────────────────────────

#[test]
fn bridge_frame_forwards_when_extension_enabled() {
    let (mut svc, mut io, mut sink) = make_service(config(true, false));
    let clock = FixedClock::untrusted();

    let out = svc.handle_frame(&[0x06, 0x03], &clock, &mut io, &mut sink);

    assert!(matches!(out, Ok(Dispatched::Bridge(cmd)) if cmd.selector == 3));
    assert_eq!(io.calls, vec![IoCall::Forward(3)]);
    assert_eq!(clock.reads(), 0, "bridge frames never consult the clock");
}

#[test]
fn bridge_frame_is_refused_when_extension_disabled() {
    let (mut svc, mut io, mut sink) = make_service(config(false, true));
    let out = svc.handle_frame(&[0x06, 0x03], &FixedClock::trusted(T0), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::FeatureDisabled));
    assert!(io.calls.is_empty());
}

#[test]
fn disabled_gate_wins_over_bad_opcode() {
    let (mut svc, mut io, mut sink) = make_service(config(false, false));
    let out = svc.handle_frame(&[0x07, 0x03], &FixedClock::trusted(T0), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::FeatureDisabled));
}

#[test]
fn wrong_bridge_opcode_is_malformed() {
    let (mut svc, mut io, mut sink) = make_service(config(true, false));
    let out = svc.handle_frame(&[0x05, 0x03], &FixedClock::trusted(T0), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::MalformedPayload));
    assert!(io.calls.is_empty());
}

// ── Schedule frames ───────────────────────────────────────────

#[test]
fn schedule_frame_programs_timer() {
    let (mut svc, mut io, mut sink) = make_service(config(false, true));

    let out = svc.handle_frame(&SCHEDULE_FRAME, &FixedClock::untrusted(), &mut io, &mut sink);

    let Ok(Dispatched::Schedule(event)) = out else {
        panic!("expected schedule dispatch, got {out:?}");
    };
    assert_eq!(event.action, TimerAction::Single { channel: 3, on: true });
    assert_eq!(event.repetition, Repetition::Daily);
    assert_eq!(io.calls, vec![IoCall::Program(event)]);
}

#[test]
fn schedule_frame_is_refused_when_scheduling_disabled() {
    let (mut svc, mut io, mut sink) = make_service(config(true, false));
    let out = svc.handle_frame(&SCHEDULE_FRAME, &FixedClock::trusted(T0), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::FeatureDisabled));
}

#[test]
fn full_timer_table_still_counts_as_accepted() {
    let (mut svc, mut io, mut sink) = make_service(config(false, true));
    io.schedule_full = true;

    let out = svc.handle_frame(&SCHEDULE_FRAME, &FixedClock::untrusted(), &mut io, &mut sink);

    assert!(out.is_ok());
    assert_eq!(svc.stats().accepted, 1);
    assert_eq!(svc.stats().rejected, 0);
}

#[test]
fn bad_bcd_in_schedule_is_malformed() {
    let (mut svc, mut io, mut sink) = make_service(config(false, true));
    let mut frame = SCHEDULE_FRAME;
    frame[8] = 0x6A;
    let out = svc.handle_frame(&frame, &FixedClock::untrusted(), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::MalformedPayload));
}

#[test]
fn schedule_without_end_marker_programs_nothing() {
    let (mut svc, mut io, mut sink) = make_service(config(false, true));
    let mut frame = SCHEDULE_FRAME;
    frame[13] = 0x00;
    let out = svc.handle_frame(&frame, &FixedClock::untrusted(), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::MalformedPayload));
    assert!(io.calls.is_empty());
    assert_eq!(svc.stats().accepted, 0);
}

#[test]
fn schedule_before_epoch_is_rejected_not_counted() {
    let (mut svc, mut io, mut sink) = make_service(config(false, true));
    let mut frame = SCHEDULE_FRAME;
    // 1925-03-01 cannot be expressed in epoch seconds.
    frame[1] = 0x19;
    let out = svc.handle_frame(&frame, &FixedClock::untrusted(), &mut io, &mut sink);
    assert_eq!(out, Err(RejectReason::MalformedPayload));
    assert!(io.calls.is_empty());
    assert_eq!(svc.stats().accepted, 0);
    assert_eq!(svc.stats().rejected, 1);
}

// ── Length classification ─────────────────────────────────────

#[test]
fn unsupported_lengths_are_rejected_without_side_effects() {
    let (mut svc, mut io, mut sink) = make_service(config(true, true));
    let clock = FixedClock::trusted(T0);

    for len in [0usize, 1, 3, 13, 15, 16, 18, 33, 35, 64] {
        let frame = vec![0x06; len];
        assert_eq!(
            svc.handle_frame(&frame, &clock, &mut io, &mut sink),
            Err(RejectReason::UnsupportedLength),
            "len={len}"
        );
        assert_eq!(
            sink.last(),
            Some(&AppEvent::FrameRejected {
                kind: None,
                len,
                reason: RejectReason::UnsupportedLength,
            })
        );
    }
    assert!(io.calls.is_empty());
    assert_eq!(clock.reads(), 0);
}

#[test]
fn stats_track_every_decision() {
    let (mut svc, mut io, mut sink) = make_service(config(true, false));
    let clock = FixedClock::trusted(T0);

    svc.handle_frame(&KAT_BINARY, &clock, &mut io, &mut sink).unwrap();
    svc.handle_frame(&[0x06, 0x01], &clock, &mut io, &mut sink).unwrap();
    let _ = svc.handle_frame(&SCHEDULE_FRAME, &clock, &mut io, &mut sink);
    let _ = svc.handle_frame(&[1, 2, 3], &clock, &mut io, &mut sink);

    let stats = svc.stats();
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.rejected, 2);
    assert_eq!(stats.rejected_for(RejectReason::FeatureDisabled), 1);
    assert_eq!(stats.rejected_for(RejectReason::UnsupportedLength), 1);
    // Started + 4 decisions.
    assert_eq!(sink.events.len(), 5);
}
