//! Connection supervisor.
//!
//! Runs for the life of the process:
//!
//! ```text
//! loop {
//!     resolve address ──► connect ──► attach ──► spawn worker + handshake
//!         ──► run session until closed ──► detach ──► sleep reconnect_delay
//! }
//! ```
//!
//! The address is resolved fresh on every attempt. No failure leaves this
//! loop; each one ends in the fixed reconnect delay.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::lifecycle::dispatcher;
use crate::transport::{CloseReason, Session, notification_queue};

use super::core::MoonrakerClient;
use super::handshake;
use super::link::ConnectionState;

// ============================================================================
// Supervisor Loop
// ============================================================================

/// Connects, runs and reconnects sessions forever.
pub(crate) async fn run(client: MoonrakerClient) {
    info!("Moonraker connection supervisor started");

    loop {
        if let Err(e) = run_session(&client).await {
            warn!(error = %e, "Moonraker connection attempt failed");
        }

        client.inner.link.set_state(ConnectionState::Disconnected);

        let delay = client.inner.options.reconnect_delay;
        info!(
            delay_ms = delay.as_millis() as u64,
            "Moonraker websocket connection lost, reconnecting soon"
        );
        sleep(delay).await;
    }
}

/// Runs one session from connect to close.
async fn run_session(client: &MoonrakerClient) -> Result<()> {
    let inner = &client.inner;
    inner.link.set_state(ConnectionState::Connecting);

    let address = inner.address_source.server_address()?;
    let url = address.ws_url()?;
    info!(%url, "Connecting to Moonraker");

    let (queue, receiver) = notification_queue(inner.options.queue_capacity);
    let session = Session::connect(
        &url,
        inner.options.connect_timeout,
        Arc::clone(&inner.correlation),
        queue,
    )
    .await?;

    let id = session.id();
    inner.link.attach(session.handle());
    info!(session = %id, "Moonraker websocket open");

    let worker = tokio::spawn(dispatcher::run(client.clone(), id, receiver));
    tokio::spawn(handshake::run(client.clone(), id));

    let reason = session.run_until_closed().await;
    match &reason {
        CloseReason::Failed(e) => error!(session = %id, error = %e, "Moonraker session failed"),
        reason => info!(session = %id, ?reason, "Moonraker session closed"),
    }

    inner.link.detach(id);
    worker.abort();
    Ok(())
}
