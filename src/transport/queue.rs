//! Bounded notification dispatch queue.
//!
//! Decouples the websocket receive loop from notification processing.
//! Processing may issue its own correlated requests; if it ran on the
//! receive loop, the replies it waits for could never be read.
//!
//! The producer side never blocks: a full queue is reported as
//! [`Error::QueueOverflow`] and the session is torn down, since a consumer
//! that cannot keep up would otherwise let printer state silently diverge.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::error;

use crate::error::{Error, Result};
use crate::protocol::Notification;

// ============================================================================
// Constants
// ============================================================================

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20_000;

// ============================================================================
// Constructor
// ============================================================================

/// Creates a bounded queue and returns its two ends.
///
/// A capacity of zero is raised to one.
#[must_use]
pub fn notification_queue(capacity: usize) -> (NotificationQueue, NotificationReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (
        NotificationQueue { tx, capacity },
        NotificationReceiver { rx },
    )
}

// ============================================================================
// NotificationQueue
// ============================================================================

/// Producer end, owned by the receive loop.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
    capacity: usize,
}

impl NotificationQueue {
    /// Enqueues without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::QueueOverflow`] if the queue is full
    /// - [`Error::NotConnected`] if the consumer is gone
    pub fn push(&self, notification: Notification) -> Result<()> {
        match self.tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                error!(
                    capacity = self.capacity,
                    method = %dropped.method,
                    "Notification queue is full"
                );
                Err(Error::queue_overflow(self.capacity))
            }
            Err(TrySendError::Closed(_)) => Err(Error::NotConnected),
        }
    }

    /// Returns the queue capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// NotificationReceiver
// ============================================================================

/// Consumer end, owned by the single dispatch worker.
pub struct NotificationReceiver {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationReceiver {
    /// Waits for the next notification in arrival order.
    ///
    /// Returns `None` once every producer is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }
}

// ============================================================================
// Tests
// ============================================================================
