//! Private RPC protocol
//!
//! Host and embedded terminal exchange commands and queries over the same
//! byte stream as ordinary output, framed as `CSI >` sequences:
//! - `frame`: grammar, id namespace, validation and encoding
//! - `pending`: correlation of outbound queries with their replies
//! - `sweeper`: background timeout of unanswered queries
//! - `endpoint`: inbound dispatch, outbound sends, the outbound byte queue

mod endpoint;
pub mod frame;
mod pending;
mod sweeper;

pub use endpoint::{CommandHandler, Outbox, QueryHandler, Responder, RpcClient, RpcEndpoint};
pub use frame::{RpcFrame, RpcFrameType, RpcSequence, SENTINEL_ERROR};
pub use pending::{PendingQuery, QueryHandle, QueryResult};
