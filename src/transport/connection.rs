//! WebSocket session and event loop.
//!
//! A [`Session`] owns one physical websocket to Moonraker. Its event loop
//! is the only reader and the only writer of the socket:
//!
//! - Incoming replies resolve entries in the [`CorrelationTable`]
//! - Incoming notifications go to the [`NotificationQueue`]
//! - Outgoing frames arrive through [`SessionHandle`]s and are written in
//!   the order they were queued
//!
//! The loop never waits on a correlated round trip itself. It runs until
//! the socket closes, a handle asks it to close, or a frame cannot be
//! handled, and reports why as a [`CloseReason`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId};
use crate::protocol::{Notification, NotificationKind};

use super::correlation::CorrelationTable;
use super::queue::NotificationQueue;

// ============================================================================
// CloseReason
// ============================================================================

/// Why a session's event loop stopped.
#[derive(Debug)]
pub enum CloseReason {
    /// Moonraker sent a close frame.
    ClosedByRemote,
    /// The stream ended without a close frame.
    StreamEnded,
    /// A [`SessionHandle::close`] call.
    Requested,
    /// Moonraker announced that klippy is restarting.
    KlippyDisconnected,
    /// A frame could not be read, handled, or written.
    Failed(Error),
}

// ============================================================================
// SessionCommand
// ============================================================================

/// Internal commands for the event loop.
enum SessionCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Close,
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Cloneable handle used to write to, or close, one session.
///
/// Writes are queued to the event loop without waiting, so a handle can
/// be used while holding a synchronous lock.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Returns the identity of the session.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues a text frame for the event loop to write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the event loop has stopped.
    pub fn send_text(&self, text: String) -> Result<()> {
        self.command_tx
            .send(SessionCommand::Send(text))
            .map_err(|_| Error::NotConnected)
    }

    /// Asks the event loop to close the socket.
    pub fn close(&self) {
        let _ = self.command_tx.send(SessionCommand::Close);
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One websocket connection to Moonraker.
pub struct Session<S = MaybeTlsStream<TcpStream>> {
    id: SessionId,
    ws_stream: WebSocketStream<S>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    correlation: Arc<CorrelationTable>,
    queue: NotificationQueue,
}

impl Session {
    /// Opens a websocket to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be opened within
    /// `connect_timeout`.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        correlation: Arc<CorrelationTable>,
        queue: NotificationQueue,
    ) -> Result<Self> {
        let (ws_stream, _response) = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "Timed out after {}ms connecting to {url}",
                    connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::connection(format!("Failed to connect to {url}: {e}")))?;

        Ok(Self::from_stream(ws_stream, correlation, queue))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already open websocket stream.
    pub fn from_stream(
        ws_stream: WebSocketStream<S>,
        correlation: Arc<CorrelationTable>,
        queue: NotificationQueue,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let id = SessionId::next();

        debug!(session = %id, "Session created");

        Self {
            id,
            ws_stream,
            command_tx,
            command_rx,
            correlation,
            queue,
        }
    }

    /// Returns the identity of this session.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns a new handle to this session.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            command_tx: self.command_tx.clone(),
        }
    }

    /// Runs the event loop until the session closes.
    pub async fn run_until_closed(self) -> CloseReason {
        let Self {
            id,
            ws_stream,
            mut command_rx,
            correlation,
            queue,
            ..
        } = self;

        let (mut ws_write, mut ws_read) = ws_stream.split();

        let reason = loop {
            tokio::select! {
                // Incoming frames from Moonraker
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match route_frame(&text, &correlation, &queue) {
                                Ok(None) => {}
                                Ok(Some(reason)) => break reason,
                                Err(e) => break CloseReason::Failed(e),
                            }
                        }

                        Some(Ok(Message::Close(_))) => break CloseReason::ClosedByRemote,

                        Some(Err(e)) => break CloseReason::Failed(Error::WebSocket(e)),

                        None => break CloseReason::StreamEnded,

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from handles
                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                break CloseReason::Failed(Error::WebSocket(e));
                            }
                            trace!(session = %id, "Frame sent");
                        }

                        Some(SessionCommand::Close) | None => {
                            let _ = ws_write.close().await;
                            break CloseReason::Requested;
                        }
                    }
                }
            }
        };

        debug!(session = %id, ?reason, "Session event loop terminated");
        reason
    }
}

// ============================================================================
// Frame Routing
// ============================================================================

/// Routes one incoming text frame.
///
/// Returns `Some(reason)` when the frame ends the session.
fn route_frame(
    text: &str,
    correlation: &CorrelationTable,
    queue: &NotificationQueue,
) -> Result<Option<CloseReason>> {
    let frame: Map<String, Value> = match serde_json::from_str(text)? {
        Value::Object(frame) => frame,
        _ => {
            warn!(frame = %text, "Message received that is not a JSON object");
            return Ok(None);
        }
    };

    if let Some(raw_id) = frame.get("id") {
        let id = RequestId::from_value(raw_id)
            .ok_or_else(|| Error::protocol(format!("Reply with invalid id: {raw_id}")))?;

        if correlation.resolve(id, frame) {
            debug!(%id, "RPC response received");
        } else {
            warn!(%id, "RPC response received, but there is no waiting context");
        }
        return Ok(None);
    }

    let Some(notification) = Notification::from_frame(frame) else {
        warn!(frame = %text, "Message received with no method");
        return Ok(None);
    };

    if notification.kind() == NotificationKind::KlippyDisconnected {
        info!("Received notify_klippy_disconnected, restarting the session");
        return Ok(Some(CloseReason::KlippyDisconnected));
    }

    queue.push(notification)?;
    Ok(None)
}

// ============================================================================
// Tests
// ============================================================================
