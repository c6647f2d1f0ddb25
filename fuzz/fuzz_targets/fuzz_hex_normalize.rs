//! Fuzz target: hex normalization
//!
//! Any 34-byte input either fails as a whole or decodes to a command whose
//! uppercase re-encoding matches the input up to ASCII case.
//!
//! cargo fuzz run fuzz_hex_normalize

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaygate::protocol::classify::AUTH_HEX_LEN;
use relaygate::protocol::normalize::normalize_hex;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = <&[u8; AUTH_HEX_LEN]>::try_from(data) else {
        return;
    };
    if let Ok(cmd) = normalize_hex(raw) {
        assert!(cmd.to_hex().eq_ignore_ascii_case(raw));
        assert!(raw.iter().all(u8::is_ascii_hexdigit));
    } else {
        assert!(!raw.iter().all(u8::is_ascii_hexdigit));
    }
});
