//! RPC endpoint: inbound dispatch and outbound sends
//!
//! Frames we emit are not written anywhere directly. They are queued in an
//! [`Outbox`] that the host drains and forwards to the peer, the same way
//! terminal replies are queued for the PTY.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::RpcConfig;
use crate::diagnostics::RpcStats;
use crate::error::{Result, RpcError};

use super::frame::{RpcFrame, RpcFrameType, RpcSequence, SENTINEL_ERROR};
use super::pending::{PendingQuery, PendingTable, QueryHandle};
use super::sweeper::TimeoutSweeper;

/// Queue of encoded frames waiting to go to the peer
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, bytes: Vec<u8>) {
        self.queue.lock().push_back(bytes);
    }

    /// Take every queued frame, oldest first
    pub fn take(&self) -> Vec<Vec<u8>> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// Cloneable handle for sending commands and queries from any thread
#[derive(Debug, Clone)]
pub struct RpcClient {
    version: u16,
    timeout: Duration,
    pending: Arc<Mutex<PendingTable>>,
    outbox: Outbox,
}

impl RpcClient {
    fn new(config: &RpcConfig, outbox: Outbox) -> Self {
        Self {
            version: config.protocol_version,
            timeout: config.query_timeout(),
            pending: Arc::new(Mutex::new(PendingTable::new())),
            outbox,
        }
    }

    /// Queue a fire-and-forget command
    pub fn send_command(&self, command_id: u16, params: &[u32]) -> std::result::Result<(), RpcError> {
        let frame = RpcFrame::outbound(RpcFrameType::FireAndForget, command_id, self.version, params)?;
        if self.pending.lock().is_closed() {
            return Err(RpcError::Cancelled(command_id));
        }
        tracing::trace!(command_id, "Sending RPC command");
        self.outbox.push(frame.encode());
        Ok(())
    }

    /// Queue a query and register it for correlation
    pub fn send_query(&self, command_id: u16, params: &[u32]) -> std::result::Result<QueryHandle, RpcError> {
        let frame = RpcFrame::outbound(RpcFrameType::Query, command_id, self.version, params)?;

        let mut pending = self.pending.lock();
        let handle = pending.insert(PendingQuery::new(command_id, Instant::now(), self.timeout))?;
        // Queued under the lock so the reply can never beat the registration
        self.outbox.push(frame.encode());
        drop(pending);

        tracing::trace!(command_id, "Sending RPC query");
        Ok(handle)
    }

    /// Time out every query whose deadline is at or before `now`
    pub fn sweep_expired(&self, now: Instant) -> Vec<u16> {
        let expired = self.pending.lock().expire(now);
        for &command_id in &expired {
            tracing::warn!(command_id, "RPC query timed out");
        }
        expired
    }

    /// Ids of queries still waiting, ascending
    pub fn pending_ids(&self) -> Vec<u16> {
        self.pending.lock().ids()
    }

    pub fn is_pending(&self, command_id: u16) -> bool {
        self.pending.lock().contains(command_id)
    }

    pub fn protocol_version(&self) -> u16 {
        self.version
    }

    fn complete(&self, command_id: u16, result: std::result::Result<Vec<u32>, RpcError>) -> bool {
        self.pending.lock().complete(command_id, result)
    }

    fn close(&self) -> usize {
        self.pending.lock().close()
    }
}

/// Reply slot for one inbound query.
///
/// Emits exactly one `R` or `E`. Dropping it without answering emits `E`
/// with the generic error code.
#[derive(Debug)]
pub struct Responder {
    command_id: u16,
    version: u16,
    outbox: Outbox,
    in_flight: Arc<Mutex<HashSet<u16>>>,
    answered: bool,
}

impl Responder {
    pub fn command_id(&self) -> u16 {
        self.command_id
    }

    /// Answer with an `R` frame
    pub fn respond(mut self, params: &[u32]) {
        self.reply(RpcFrameType::Response, params);
    }

    /// Answer with an `E` frame
    pub fn error(mut self, params: &[u32]) {
        self.reply(RpcFrameType::Error, params);
    }

    fn reply(&mut self, frame_type: RpcFrameType, params: &[u32]) {
        if self.answered {
            return;
        }
        self.answered = true;
        let frame = RpcFrame {
            command_id: self.command_id,
            protocol_version: self.version,
            frame_type,
            params: params.to_vec(),
        };
        self.outbox.push(frame.encode());
        self.in_flight.lock().remove(&self.command_id);
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if !self.answered {
            tracing::debug!(command_id = self.command_id, "Query dropped unanswered");
            self.reply(RpcFrameType::Error, &[u32::from(SENTINEL_ERROR)]);
        }
    }
}

/// Handler for an inbound fire-and-forget command
pub type CommandHandler = Box<dyn FnMut(&RpcFrame) + Send>;
/// Handler for an inbound query
pub type QueryHandler = Box<dyn FnMut(&RpcFrame, Responder) + Send>;

/// One side of the RPC channel
pub struct RpcEndpoint {
    client: RpcClient,
    outbox: Outbox,
    commands: HashMap<u16, CommandHandler>,
    queries: HashMap<u16, QueryHandler>,
    in_flight: Arc<Mutex<HashSet<u16>>>,
    stats: RpcStats,
    sweeper: Option<TimeoutSweeper>,
}

impl RpcEndpoint {
    /// Create an endpoint, starting the timeout sweeper unless disabled
    pub fn new(config: &RpcConfig) -> Result<Self> {
        let outbox = Outbox::new();
        let client = RpcClient::new(config, outbox.clone());
        let sweeper = match config.sweep_interval() {
            Some(interval) => Some(TimeoutSweeper::spawn(interval, client.pending.clone())?),
            None => None,
        };
        Ok(Self {
            client,
            outbox,
            commands: HashMap::new(),
            queries: HashMap::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            stats: RpcStats::default(),
            sweeper,
        })
    }

    pub fn client(&self) -> RpcClient {
        self.client.clone()
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn stats(&self) -> &RpcStats {
        &self.stats
    }

    /// Register the handler for command `command_id`
    pub fn on_command<F>(&mut self, command_id: u16, handler: F)
    where
        F: FnMut(&RpcFrame) + Send + 'static,
    {
        self.commands.insert(command_id, Box::new(handler));
    }

    /// Register the handler for query `command_id`
    pub fn on_query<F>(&mut self, command_id: u16, handler: F)
    where
        F: FnMut(&RpcFrame, Responder) + Send + 'static,
    {
        self.queries.insert(command_id, Box::new(handler));
    }

    /// Validate and dispatch an inbound sequence.
    ///
    /// Errors are informational: the frame has already been counted,
    /// logged and dropped.
    pub fn receive(&mut self, sequence: &RpcSequence) -> std::result::Result<(), RpcError> {
        let frame = match RpcFrame::validate(sequence, self.client.version) {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.rejected += 1;
                tracing::debug!("Rejected RPC frame: {}", err);
                return Err(err);
            }
        };

        let command_id = frame.command_id;
        match frame.frame_type {
            RpcFrameType::FireAndForget => match self.commands.get_mut(&command_id) {
                Some(handler) => handler(&frame),
                None => {
                    self.stats.unhandled += 1;
                    tracing::debug!(command_id, "No handler for RPC command");
                }
            },
            RpcFrameType::Query => return self.answer(frame),
            RpcFrameType::Response | RpcFrameType::Error => {
                let result = if frame.frame_type == RpcFrameType::Response {
                    Ok(frame.params)
                } else {
                    Err(RpcError::RemoteError {
                        command_id,
                        params: frame.params,
                    })
                };
                if !self.client.complete(command_id, result) {
                    self.stats.unsolicited += 1;
                    tracing::warn!(command_id, "Dropping unsolicited RPC reply");
                    return Err(RpcError::UnsolicitedResponse(command_id));
                }
            }
        }
        Ok(())
    }

    fn answer(&mut self, frame: RpcFrame) -> std::result::Result<(), RpcError> {
        let command_id = frame.command_id;
        if !self.in_flight.lock().insert(command_id) {
            self.stats.rejected += 1;
            tracing::debug!(command_id, "Query already in flight");
            self.emit_error(command_id);
            return Err(RpcError::DuplicatePendingQuery(command_id));
        }

        let responder = Responder {
            command_id,
            version: self.client.version,
            outbox: self.outbox.clone(),
            in_flight: self.in_flight.clone(),
            answered: false,
        };

        match self.queries.get_mut(&command_id) {
            Some(handler) => handler(&frame, responder),
            None => {
                self.stats.unhandled += 1;
                tracing::debug!(command_id, "No handler for RPC query");
                // Dropping the responder answers with E
                drop(responder);
            }
        }
        Ok(())
    }

    fn emit_error(&self, command_id: u16) {
        let frame = RpcFrame {
            command_id,
            protocol_version: self.client.version,
            frame_type: RpcFrameType::Error,
            params: vec![u32::from(SENTINEL_ERROR)],
        };
        self.outbox.push(frame.encode());
    }

    /// Cancel every pending query and stop the sweeper. Idempotent.
    pub fn close(&mut self) {
        let cancelled = self.client.close();
        if cancelled > 0 {
            tracing::debug!(cancelled, "Cancelled pending RPC queries");
        }
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
    }
}

impl Drop for RpcEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("client", &self.client)
            .field("commands", &self.commands.len())
            .field("queries", &self.queries.len())
            .field("stats", &self.stats)
            .field("sweeper", &self.sweeper.is_some())
            .finish()
    }
}
