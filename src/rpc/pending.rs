//! Outbound query correlation
//!
//! Each query we send gets one entry keyed by its command id, holding the
//! sending half of a oneshot channel. Whoever removes the entry first (a
//! reply, the timeout sweep, or cancellation) completes the query; the
//! others find nothing to do.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::error::RpcError;

/// Reply parameters, or why there are none
pub type QueryResult = Result<Vec<u32>, RpcError>;

/// An outbound query waiting for its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub command_id: u16,
    pub issued_at: Instant,
    pub deadline: Instant,
}

impl PendingQuery {
    pub fn new(command_id: u16, issued_at: Instant, timeout: Duration) -> Self {
        Self {
            command_id,
            issued_at,
            deadline: issued_at + timeout,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug)]
struct Entry {
    query: PendingQuery,
    reply: oneshot::Sender<QueryResult>,
}

/// All outstanding outbound queries. At most one per command id.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: HashMap<u16, Entry>,
    closed: bool,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a query and hand back its completion handle
    pub(crate) fn insert(&mut self, query: PendingQuery) -> Result<QueryHandle, RpcError> {
        let command_id = query.command_id;
        if self.closed {
            return Err(RpcError::Cancelled(command_id));
        }
        if self.entries.contains_key(&command_id) {
            return Err(RpcError::DuplicatePendingQuery(command_id));
        }
        let (reply, rx) = oneshot::channel();
        self.entries.insert(command_id, Entry { query, reply });
        Ok(QueryHandle { command_id, rx })
    }

    /// Complete the query for `command_id`. False if none was pending.
    pub(crate) fn complete(&mut self, command_id: u16, result: QueryResult) -> bool {
        match self.entries.remove(&command_id) {
            Some(entry) => {
                // The handle may already be gone; nothing to tell then
                let _ = entry.reply.send(result);
                true
            }
            None => false,
        }
    }

    /// Time out every query whose deadline has passed, returning their ids
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<u16> {
        let mut expired: Vec<u16> = self
            .entries
            .values()
            .filter(|entry| entry.query.is_expired(now))
            .map(|entry| entry.query.command_id)
            .collect();
        expired.sort_unstable();
        for &command_id in &expired {
            self.complete(command_id, Err(RpcError::QueryTimeout(command_id)));
        }
        expired
    }

    /// Cancel everything and refuse new queries
    pub(crate) fn close(&mut self) -> usize {
        self.closed = true;
        let ids: Vec<u16> = self.entries.keys().copied().collect();
        for &command_id in &ids {
            self.complete(command_id, Err(RpcError::Cancelled(command_id)));
        }
        ids.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn contains(&self, command_id: u16) -> bool {
        self.entries.contains_key(&command_id)
    }

    pub(crate) fn get(&self, command_id: u16) -> Option<PendingQuery> {
        self.entries.get(&command_id).map(|entry| entry.query)
    }

    /// Pending ids in ascending order
    pub(crate) fn ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Completion handle for one outbound query.
///
/// Await it, block on it with [`wait`](Self::wait), or poll it with
/// [`try_result`](Self::try_result). It resolves exactly once.
#[derive(Debug)]
pub struct QueryHandle {
    command_id: u16,
    rx: oneshot::Receiver<QueryResult>,
}

impl QueryHandle {
    pub fn command_id(&self) -> u16 {
        self.command_id
    }

    /// Block the current thread until the query completes.
    ///
    /// Returns no later than the query timeout while the session's sweeper
    /// runs. Must not be called from inside an async runtime.
    pub fn wait(self) -> QueryResult {
        let command_id = self.command_id;
        self.rx
            .blocking_recv()
            .unwrap_or(Err(RpcError::Cancelled(command_id)))
    }

    /// The result if the query has completed, `None` while still pending
    pub fn try_result(&mut self) -> Option<QueryResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(RpcError::Cancelled(self.command_id)))
            }
        }
    }
}

impl Future for QueryHandle {
    type Output = QueryResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let command_id = self.command_id;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(RpcError::Cancelled(command_id))))
    }
}
