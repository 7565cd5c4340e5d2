//! Current session slot and readiness flags.
//!
//! The [`Link`] holds the one live [`SessionHandle`] together with the
//! `connected` and `klippy_ready` flags. All three change together under
//! one lock, and every mutation names the session it is meant for: a
//! handshake or worker belonging to a replaced session finds the identity
//! mismatch and leaves the new session alone.
//!
//! Writes also go through the lock, so there is a single writer to the
//! socket at any time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::SessionHandle;

// ============================================================================
// ConnectionState
// ============================================================================

/// Observable connection state.
///
/// ```text
/// Disconnected → Connecting → Open → KlippyWaiting → Ready
///       ▲                                              │
///       └──────────────── close / error ───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No session.
    #[default]
    Disconnected,
    /// Opening a websocket.
    Connecting,
    /// Websocket open, handshake not started.
    Open,
    /// Polling `server.info` until klippy is ready.
    KlippyWaiting,
    /// Klippy ready; normal requests allowed.
    Ready,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::KlippyWaiting => "klippy-waiting",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Which sessions a write may go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    /// The current session, only once klippy is ready.
    Ready,
    /// This exact session, ready or not. Handshake traffic only.
    Session(SessionId),
}

// ============================================================================
// Link
// ============================================================================

#[derive(Default)]
struct Slot {
    session: Option<SessionHandle>,
    connected: bool,
    klippy_ready: bool,
}

/// The current session and its readiness.
pub(crate) struct Link {
    slot: Mutex<Slot>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Link {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            slot: Mutex::new(Slot::default()),
            state_tx,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Publishes a state that is not tied to a session.
    pub fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Publishes `state` if `id` is still the current session.
    pub fn set_state_if_current(&self, id: SessionId, state: ConnectionState) -> bool {
        let slot = self.slot.lock();
        if !is_current(&slot, id) {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Returns `true` if connected and klippy is ready.
    pub fn is_ready(&self) -> bool {
        let slot = self.slot.lock();
        slot.connected && slot.klippy_ready
    }

    /// Returns `true` if `id` is the current session.
    pub fn is_current(&self, id: SessionId) -> bool {
        is_current(&self.slot.lock(), id)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Installs a freshly opened session.
    pub fn attach(&self, handle: SessionHandle) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.session.replace(handle) {
            previous.close();
        }
        slot.connected = true;
        slot.klippy_ready = false;
        self.state_tx.send_replace(ConnectionState::Open);
    }

    /// Clears the slot if `id` is still the current session.
    pub fn detach(&self, id: SessionId) -> bool {
        let mut slot = self.slot.lock();
        if !is_current(&slot, id) {
            return false;
        }
        *slot = Slot::default();
        self.state_tx.send_replace(ConnectionState::Disconnected);
        true
    }

    /// Marks klippy ready on session `id`.
    ///
    /// Returns `false` without touching anything if `id` was replaced.
    pub fn mark_klippy_ready(&self, id: SessionId) -> bool {
        let mut slot = self.slot.lock();
        if !is_current(&slot, id) {
            return false;
        }
        slot.klippy_ready = true;
        self.state_tx.send_replace(ConnectionState::Ready);
        true
    }

    /// Asks session `id` to close, if it is still current.
    pub fn close_session(&self, id: SessionId) {
        let slot = self.slot.lock();
        match &slot.session {
            Some(handle) if handle.id() == id => handle.close(),
            _ => debug!(session = %id, "Close requested for a session that is no longer current"),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Returns `true` if a write through `gate` could currently succeed.
    pub fn accepts(&self, gate: Gate) -> bool {
        admits(&self.slot.lock(), gate).is_some()
    }

    /// Writes a frame to the session admitted by `gate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no session is admitted or its
    /// event loop has stopped.
    pub fn write(&self, text: String, gate: Gate) -> Result<()> {
        let slot = self.slot.lock();
        let handle = admits(&slot, gate).ok_or(Error::NotConnected)?;
        handle.send_text(text)
    }
}

fn is_current(slot: &Slot, id: SessionId) -> bool {
    slot.session.as_ref().is_some_and(|handle| handle.id() == id)
}

fn admits(slot: &Slot, gate: Gate) -> Option<&SessionHandle> {
    let handle = slot.session.as_ref()?;
    match gate {
        Gate::Ready if slot.connected && slot.klippy_ready => Some(handle),
        Gate::Session(id) if handle.id() == id => Some(handle),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
