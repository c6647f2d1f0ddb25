//! RS485 bridge command (2 bytes, unauthenticated).
//!
//! `[opcode][selector]`; only opcode `0x06` is meaningful.  The selector
//! names a pre-defined Modbus RTU frame that the bridge collaborator sends
//! to an off-board relay module.

use crate::error::RejectReason;

use super::classify::BRIDGE_FRAME_LEN;

pub const BRIDGE_OPCODE: u8 = 0x06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeCommand {
    pub selector: u8,
}

pub fn parse(raw: &[u8; BRIDGE_FRAME_LEN]) -> Result<BridgeCommand, RejectReason> {
    let [opcode, selector] = *raw;
    if opcode != BRIDGE_OPCODE {
        return Err(RejectReason::MalformedPayload);
    }
    Ok(BridgeCommand { selector })
}
