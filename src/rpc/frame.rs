//! RPC frame grammar
//!
//! `ESC [ > Pn ; Pv [; extra...] Pc` where `Pn` is the command id, `Pv` the
//! protocol version and `Pc` one of `F`, `Q`, `R`, `E`. The command id
//! namespace fixes which frame types an id may travel in:
//!
//! | ids       | frames                    |
//! |-----------|---------------------------|
//! | 1000-1999 | F (fire-and-forget)       |
//! | 2000-2999 | Q, and R/E replies to it  |
//! | 3000-8999 | reserved, nothing         |
//! | 9000-9999 | E (system errors)         |

use std::fmt::Write;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::parser::Params;

/// Ids for fire-and-forget commands
pub const COMMAND_RANGE: RangeInclusive<u16> = 1000..=1999;
/// Ids for queries and their replies
pub const QUERY_RANGE: RangeInclusive<u16> = 2000..=2999;
/// Ids for system-level error frames
pub const SYSTEM_RANGE: RangeInclusive<u16> = 9000..=9999;
/// Generic error / timeout code
pub const SENTINEL_ERROR: u16 = 9999;

const MIN_COMMAND_ID: u32 = 1000;
const MAX_COMMAND_ID: u32 = 9999;

/// Frame type, selected by the final byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcFrameType {
    /// `F`
    FireAndForget,
    /// `Q`
    Query,
    /// `R`
    Response,
    /// `E`
    Error,
}

impl RpcFrameType {
    pub fn from_final(byte: u8) -> Option<Self> {
        match byte {
            b'F' => Some(RpcFrameType::FireAndForget),
            b'Q' => Some(RpcFrameType::Query),
            b'R' => Some(RpcFrameType::Response),
            b'E' => Some(RpcFrameType::Error),
            _ => None,
        }
    }

    pub fn final_byte(self) -> u8 {
        match self {
            RpcFrameType::FireAndForget => b'F',
            RpcFrameType::Query => b'Q',
            RpcFrameType::Response => b'R',
            RpcFrameType::Error => b'E',
        }
    }

    /// Whether `command_id` may travel in a frame of this type
    pub fn allows(self, command_id: u16) -> bool {
        match self {
            RpcFrameType::FireAndForget => COMMAND_RANGE.contains(&command_id),
            RpcFrameType::Query | RpcFrameType::Response => QUERY_RANGE.contains(&command_id),
            RpcFrameType::Error => {
                QUERY_RANGE.contains(&command_id) || SYSTEM_RANGE.contains(&command_id)
            }
        }
    }
}

/// A `CSI > ... F|Q|R|E` sequence as the parser saw it, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcSequence {
    params: Params,
    frame_type: RpcFrameType,
}

impl RpcSequence {
    pub fn new(params: Params, frame_type: RpcFrameType) -> Self {
        Self { params, frame_type }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn frame_type(&self) -> RpcFrameType {
        self.frame_type
    }
}

/// A validated RPC frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFrame {
    pub command_id: u16,
    pub protocol_version: u16,
    pub frame_type: RpcFrameType,
    /// Parameters after the version
    pub params: Vec<u32>,
}

impl RpcFrame {
    /// Validate an inbound sequence.
    ///
    /// Checks run in a fixed order and the first failure wins: id range,
    /// protocol version, id/type agreement, then plain parameters.
    pub fn validate(sequence: &RpcSequence, version: u16) -> Result<Self, RpcError> {
        let params = sequence.params();
        let raw_id = params.raw(0);
        let command_id = checked_id(raw_id)?;

        let found = params.raw(1);
        if found != u32::from(version) {
            return Err(RpcError::ProtocolVersionMismatch {
                expected: version,
                found,
            });
        }

        check_type(command_id, sequence.frame_type())?;

        if let Some(index) = (0..params.len()).find(|&i| !params.subparams(i).is_empty()) {
            return Err(RpcError::InvalidParameter { command_id, index });
        }

        Ok(Self {
            command_id,
            protocol_version: version,
            frame_type: sequence.frame_type(),
            params: params.iter().skip(2).collect(),
        })
    }

    /// Build an outbound frame, applying the same id rules as inbound
    pub fn outbound(
        frame_type: RpcFrameType,
        command_id: u16,
        version: u16,
        params: &[u32],
    ) -> Result<Self, RpcError> {
        checked_id(u32::from(command_id))?;
        check_type(command_id, frame_type)?;
        Ok(Self {
            command_id,
            protocol_version: version,
            frame_type,
            params: params.to_vec(),
        })
    }

    /// Wire bytes for this frame
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::with_capacity(16 + self.params.len() * 4);
        let _ = write!(out, "\x1b[>{};{}", self.command_id, self.protocol_version);
        for param in &self.params {
            let _ = write!(out, ";{}", param);
        }
        out.push(char::from(self.frame_type.final_byte()));
        out.into_bytes()
    }
}

fn checked_id(raw: u32) -> Result<u16, RpcError> {
    if !(MIN_COMMAND_ID..=MAX_COMMAND_ID).contains(&raw) {
        return Err(RpcError::InvalidCommandId(raw));
    }
    u16::try_from(raw).map_err(|_| RpcError::InvalidCommandId(raw))
}

fn check_type(command_id: u16, frame_type: RpcFrameType) -> Result<(), RpcError> {
    if frame_type.allows(command_id) {
        Ok(())
    } else {
        Err(RpcError::CommandTypeMismatch {
            command_id,
            frame_type,
        })
    }
}
