//! Error types for the escape-sequence engine
//!
//! Parse faults never surface here: they are absorbed by the parser and
//! counted in [`Diagnostics`](crate::Diagnostics). These types cover
//! configuration loading and the RPC protocol, where a caller needs to know.

use std::io;
use thiserror::Error;

use crate::rpc::RpcFrameType;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed configuration document
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// RPC protocol error
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// RPC protocol errors
///
/// Validation errors (`InvalidCommandId` through `InvalidParameter`) are
/// returned synchronously from the send calls. Lifecycle errors arrive
/// through a [`QueryHandle`](crate::rpc::QueryHandle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Command id outside 1000-9999
    #[error("command id {0} is outside 1000-9999")]
    InvalidCommandId(u32),

    /// Peer speaks a different protocol version
    #[error("protocol version {found} is not supported (expected {expected})")]
    ProtocolVersionMismatch { expected: u16, found: u32 },

    /// Command id range does not allow this frame type
    #[error("command id {command_id} cannot be sent as {frame_type:?}")]
    CommandTypeMismatch {
        command_id: u16,
        frame_type: RpcFrameType,
    },

    /// Extra parameter carried sub-parameters
    #[error("parameter {index} of command {command_id} is not a plain integer")]
    InvalidParameter { command_id: u16, index: usize },

    /// A query with this id is already waiting for its reply
    #[error("query {0} is already pending")]
    DuplicatePendingQuery(u16),

    /// No reply arrived before the deadline
    #[error("query {0} timed out")]
    QueryTimeout(u16),

    /// Reply for a query nobody is waiting on
    #[error("unsolicited response for command {0}")]
    UnsolicitedResponse(u16),

    /// The session went away before the reply
    #[error("query {0} was cancelled")]
    Cancelled(u16),

    /// Peer answered with an error frame
    #[error("command {command_id} failed remotely with {params:?}")]
    RemoteError { command_id: u16, params: Vec<u32> },
}
