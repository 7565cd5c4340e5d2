//! Klippy readiness handshake.
//!
//! An open websocket does not mean klippy can answer printer queries. Each
//! new session gets its own handshake task that polls `server.info` until
//! klippy reports `ready`, subscribes to the lifecycle topics, and replays
//! the current print state to the sink.
//!
//! | `klippy_state` | Action |
//! |----------------|--------|
//! | `ready` | mark ready, subscribe, resync, stop |
//! | `startup`, `error`, `shutdown` | wait and poll again |
//! | anything else | close the session |
//!
//! The task is bound to one [`SessionId`]. Once that session is replaced
//! it stops without touching the new one.

// ============================================================================
// Imports
// ============================================================================

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::lifecycle::resync;
use crate::protocol::KlippyState;
use crate::protocol::objects::{OBJECTS_SUBSCRIBE, SERVER_INFO, subscription_params};

use super::core::MoonrakerClient;
use super::link::ConnectionState;

// ============================================================================
// Outcome
// ============================================================================

/// How a handshake ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Klippy is ready and the subscription is in place.
    Ready,
    /// The session was replaced while polling.
    Stale,
}

// ============================================================================
// Entry Point
// ============================================================================

/// Runs the handshake for `session`, then the fresh-connect resync.
pub(crate) async fn run(client: MoonrakerClient, session: SessionId) {
    match wait_for_klippy(&client, session).await {
        Ok(Outcome::Ready) => {
            info!(%session, "Klippy ready, subscribed to printer objects");
            resync::run(&client).await;
        }

        Ok(Outcome::Stale) => {
            debug!(%session, "Session replaced, handshake exiting");
        }

        Err(e) => {
            if client.inner.link.is_current(session) {
                warn!(%session, error = %e, "Klippy handshake failed, closing the session");
                client.inner.link.close_session(session);
            } else {
                debug!(%session, error = %e, "Handshake failed on a replaced session");
            }
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

async fn wait_for_klippy(client: &MoonrakerClient, session: SessionId) -> Result<Outcome> {
    let link = &client.inner.link;
    let options = &client.inner.options;
    let log_every = options.klippy_log_every.max(1);
    let mut polls: u32 = 0;

    if !link.set_state_if_current(session, ConnectionState::KlippyWaiting) {
        return Ok(Outcome::Stale);
    }

    loop {
        if !link.is_current(session) {
            return Ok(Outcome::Stale);
        }

        let result = client
            .force_send(session, SERVER_INFO, None)
            .await
            .map_err(|e| Error::handshake(format!("{SERVER_INFO} failed: {e}")))?;
        let state = KlippyState::from_server_info(&result)
            .map_err(|e| Error::handshake(e.to_string()))?;

        match state {
            KlippyState::Ready => {
                if !link.mark_klippy_ready(session) {
                    return Ok(Outcome::Stale);
                }

                client
                    .force_send(session, OBJECTS_SUBSCRIBE, Some(subscription_params()))
                    .await
                    .map_err(|e| Error::handshake(format!("Subscription failed: {e}")))?;

                return Ok(Outcome::Ready);
            }

            state if state.is_transient() => {
                if polls % log_every == 0 {
                    info!(%session, klippy_state = %state, polls, "Waiting for klippy to be ready");
                }
                polls = polls.wrapping_add(1);
                sleep(options.klippy_poll_interval).await;
            }

            state => {
                return Err(Error::handshake(format!("Unexpected klippy state: {state}")));
            }
        }
    }
}
