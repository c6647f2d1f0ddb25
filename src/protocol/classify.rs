//! Frame classifier: routes a raw inbound frame by byte length alone.
//!
//! | Length | Family                                   |
//! |--------|------------------------------------------|
//! | 2      | RS485 bridge command (unauthenticated)   |
//! | 14     | RTC scheduling command (unauthenticated) |
//! | 17     | Authenticated command, binary            |
//! | 34     | Authenticated command, ASCII hex         |
//!
//! The lengths are disjoint, so a frame can never be mistaken for a
//! different family.  Nothing here looks at payload contents, the clock,
//! or the secret.

use crate::error::RejectReason;

pub const BRIDGE_FRAME_LEN: usize = 2;
pub const SCHEDULE_FRAME_LEN: usize = 14;
pub const AUTH_BINARY_LEN: usize = 17;
pub const AUTH_HEX_LEN: usize = 34;

/// Command family of a classified frame (payload-free, `Copy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Bridge,
    Schedule,
    AuthBinary,
    AuthHex,
}

impl FrameKind {
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::AuthBinary | Self::AuthHex)
    }
}

/// A frame borrowed as the fixed-size array its family expects.
///
/// Downstream parsers take these arrays, so a wrongly sized slice cannot
/// reach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Bridge(&'a [u8; BRIDGE_FRAME_LEN]),
    Schedule(&'a [u8; SCHEDULE_FRAME_LEN]),
    AuthBinary(&'a [u8; AUTH_BINARY_LEN]),
    AuthHex(&'a [u8; AUTH_HEX_LEN]),
}

impl Frame<'_> {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Bridge(_) => FrameKind::Bridge,
            Self::Schedule(_) => FrameKind::Schedule,
            Self::AuthBinary(_) => FrameKind::AuthBinary,
            Self::AuthHex(_) => FrameKind::AuthHex,
        }
    }
}

/// Select exactly one handling path for `raw`.
pub fn classify(raw: &[u8]) -> Result<Frame<'_>, RejectReason> {
    match raw.len() {
        BRIDGE_FRAME_LEN => raw.try_into().map(Frame::Bridge),
        SCHEDULE_FRAME_LEN => raw.try_into().map(Frame::Schedule),
        AUTH_BINARY_LEN => raw.try_into().map(Frame::AuthBinary),
        AUTH_HEX_LEN => raw.try_into().map(Frame::AuthHex),
        _ => return Err(RejectReason::UnsupportedLength),
    }
    .map_err(|_| RejectReason::UnsupportedLength)
}
