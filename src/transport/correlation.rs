//! Request/response correlation table.
//!
//! Maps outstanding request ids to the callers waiting on them. The table
//! knows nothing about the transport: the client registers an entry before
//! writing a request, the receive loop resolves it when the reply lands.
//!
//! # Cleanup
//!
//! [`PendingRequest`] removes its own entry when dropped, so a caller that
//! times out, fails to send, or is cancelled never leaves a dangling entry.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to reply channels.
type WaiterMap = FxHashMap<RequestId, oneshot::Sender<Map<String, Value>>>;

/// State guarded by the table lock.
#[derive(Default)]
struct Entries {
    /// Next id to hand out.
    next_id: u64,
    /// Waiting callers.
    waiters: WaiterMap,
}

// ============================================================================
// CorrelationTable
// ============================================================================

/// Thread-safe map from request id to waiting caller.
///
/// The lock covers insert, lookup and delete only; no I/O happens while
/// it is held.
#[derive(Default)]
pub struct CorrelationTable {
    entries: Mutex<Entries>,
}

impl CorrelationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Allocates a fresh id and registers a waiter for it.
    #[must_use]
    pub fn register(self: &Arc<Self>) -> PendingRequest {
        let (tx, rx) = oneshot::channel();

        let id = {
            let mut entries = self.entries.lock();
            let id = RequestId::new(entries.next_id);
            entries.next_id += 1;
            entries.waiters.insert(id, tx);
            id
        };

        PendingRequest {
            id,
            rx,
            table: Arc::clone(self),
        }
    }

    /// Hands a reply payload to the caller waiting on `id`.
    ///
    /// Returns `false` if nobody is waiting, e.g. the caller already timed
    /// out. That is not an error.
    pub fn resolve(&self, id: RequestId, payload: Map<String, Value>) -> bool {
        let waiter = self.entries.lock().waiters.remove(&id);

        match waiter {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Returns the number of outstanding requests.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().waiters.len()
    }

    /// Returns `true` if nothing is outstanding.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes an entry.
    fn remove(&self, id: RequestId) {
        if self.entries.lock().waiters.remove(&id).is_some() {
            trace!(%id, "Removed correlation entry");
        }
    }
}

// ============================================================================
// PendingRequest
// ============================================================================

/// A registered request awaiting its reply.
///
/// Single writer (the receive loop), single waiter (the caller).
pub struct PendingRequest {
    id: RequestId,
    rx: oneshot::Receiver<Map<String, Value>>,
    table: Arc<CorrelationTable>,
}

impl PendingRequest {
    /// Returns the request id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Waits for the reply payload.
    ///
    /// The entry is removed from the table on every exit path.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no reply arrives within `wait`
    /// - [`Error::NotConnected`] if the waiter was dropped without a reply
    pub async fn wait(mut self, wait: Duration) -> Result<Map<String, Value>> {
        match timeout(wait, &mut self.rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => Err(Error::timeout(self.id, wait.as_millis() as u64)),
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

// ============================================================================
// Tests
// ============================================================================
