//! Per-session notification worker.
//!
//! The only task allowed to wait on a correlated request while reacting to
//! a notification. It drains its session's queue in arrival order and stops
//! when the queue closes, when a notification cannot be handled, or when
//! the session is aborted by the supervisor.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, error, trace};

use crate::client::MoonrakerClient;
use crate::error::Result;
use crate::identifiers::SessionId;
use crate::protocol::Notification;
use crate::transport::NotificationReceiver;

use super::{Classification, LifecycleEvent, classify};

// ============================================================================
// Worker Loop
// ============================================================================

/// Drains `receiver` until the session ends or a handler fails.
///
/// A failure closes `session` and ends the worker; the next session
/// gets a fresh worker.
pub(crate) async fn run(
    client: MoonrakerClient,
    session: SessionId,
    mut receiver: NotificationReceiver,
) {
    debug!(%session, "Notification worker started");

    while let Some(notification) = receiver.recv().await {
        trace!(%session, method = %notification.method, "Dispatching notification");

        match handle(&client, &notification).await {
            Ok(true) => {}

            Ok(false) => {
                client.inner.link.close_session(session);
                break;
            }

            Err(e) => {
                error!(
                    %session,
                    method = %notification.method,
                    error = %e,
                    "Failed to handle notification, closing the session"
                );
                client.inner.link.close_session(session);
                break;
            }
        }
    }

    debug!(%session, "Notification worker stopped");
}

/// Handles one notification. Returns `false` if the session must close.
async fn handle(client: &MoonrakerClient, notification: &Notification) -> Result<bool> {
    let events = match classify(notification)? {
        Classification::Ignore => return Ok(true),
        Classification::CloseSession => return Ok(false),
        Classification::Events(events) => events,
    };

    for event in events {
        deliver(client, event).await;
    }

    Ok(true)
}

/// Hands one event to the sink.
async fn deliver(client: &MoonrakerClient, event: LifecycleEvent) {
    let sink = &client.inner.sink;

    match event {
        LifecycleEvent::Started { filename } => sink.on_started(&filename).await,

        LifecycleEvent::Paused => {
            let filename = current_filename(client).await;
            sink.on_paused(filename.as_deref()).await;
        }

        LifecycleEvent::Resumed => {
            let filename = current_filename(client).await;
            sink.on_resume(filename.as_deref()).await;
        }

        LifecycleEvent::Progress { percent } => sink.on_print_progress(percent).await,
    }
}

/// Looks up the file being printed; `None` if unknown.
async fn current_filename(client: &MoonrakerClient) -> Option<String> {
    match client.current_print_stats().await {
        Ok(stats) => stats.filename().map(str::to_string),
        Err(e) => {
            debug!(error = %e, "Could not read print_stats for filename");
            None
        }
    }
}
