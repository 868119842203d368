//! Background query timeout sweep
//!
//! A named thread wakes every interval and times out expired queries. It
//! shares the pending table lock with reply dispatch, so a query is either
//! answered or timed out, never both.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::pending::PendingTable;

/// Handle to the sweeper thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub(crate) struct TimeoutSweeper {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutSweeper {
    pub(crate) fn spawn(interval: Duration, pending: Arc<Mutex<PendingTable>>) -> io::Result<Self> {
        let (stop, rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("catty-rpc-sweeper".into())
            .spawn(move || sweep_loop(interval, &rx, &pending))?;

        tracing::debug!(?interval, "Started RPC timeout sweeper");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub(crate) fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("RPC timeout sweeper panicked");
            }
        }
    }
}

impl Drop for TimeoutSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sweep_loop(interval: Duration, stop: &mpsc::Receiver<()>, pending: &Mutex<PendingTable>) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let expired = pending.lock().expire(Instant::now());
                for command_id in expired {
                    tracing::warn!(command_id, "RPC query timed out");
                }
            }
            // Stop requested, or the owner is gone
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("RPC timeout sweeper stopped");
}
