//! Moonraker client handle and request path.
//!
//! [`MoonrakerClient`] is a cheap, cloneable handle over shared state. One
//! instance is built at process start and handed to whatever needs to talk
//! to Moonraker.
//!
//! # Example
//!
//! ```ignore
//! use moonraker_bridge::{MoonrakerClient, ServerAddress};
//!
//! let client = MoonrakerClient::builder()
//!     .address(ServerAddress::new("127.0.0.1", 7125))
//!     .sink(my_sink)
//!     .printer_id("printer-1")
//!     .build()?;
//!
//! client.start("octo-key")?;
//! let info = client.send("printer.info", None).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::ServerAddressSource;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::lifecycle::LifecycleSink;
use crate::protocol::objects::{OBJECTS_QUERY, query_params};
use crate::protocol::{PrintStats, Reply, Request};
use crate::transport::CorrelationTable;

use super::builder::ClientBuilder;
use super::link::{ConnectionState, Gate, Link};
use super::options::ClientOptions;
use super::supervisor;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Timing and capacity settings.
    pub options: ClientOptions,

    /// Where to find Moonraker on each connection attempt.
    pub address_source: Arc<dyn ServerAddressSource>,

    /// Lifecycle event consumer.
    pub sink: Arc<dyn LifecycleSink>,

    /// Outstanding requests, shared with every session.
    pub correlation: Arc<CorrelationTable>,

    /// Current session and readiness flags.
    pub link: Link,

    /// Supervisor task, once started.
    pub supervisor: Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// MoonrakerClient
// ============================================================================

/// Persistent JSON-RPC client for Moonraker.
///
/// The client keeps one websocket open for the life of the process,
/// reconnecting after a fixed delay whenever it is lost, and turns
/// subscription notifications into [`LifecycleSink`] calls.
#[derive(Clone)]
pub struct MoonrakerClient {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// MoonrakerClient - Display
// ============================================================================

impl fmt::Debug for MoonrakerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoonrakerClient")
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MoonrakerClient - Construction
// ============================================================================

impl MoonrakerClient {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Assembles a client from validated parts.
    pub(crate) fn new(
        options: ClientOptions,
        address_source: Arc<dyn ServerAddressSource>,
        sink: Arc<dyn LifecycleSink>,
        printer_id: Option<String>,
    ) -> Self {
        if let Some(printer_id) = printer_id.as_deref() {
            sink.set_printer_id(printer_id);
        }

        Self {
            inner: Arc::new(ClientInner {
                options,
                address_source,
                sink,
                correlation: CorrelationTable::new(),
                link: Link::new(),
                supervisor: Mutex::new(None),
            }),
        }
    }

    /// Starts the connection supervisor if it is not already running.
    ///
    /// `octo_key` is forwarded to the sink on every call so it stays
    /// current; the supervisor itself is only spawned once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if called outside a tokio runtime.
    pub fn start(&self, octo_key: &str) -> Result<()> {
        self.inner.sink.set_octo_key(octo_key);

        let mut supervisor = self.inner.supervisor.lock();
        if supervisor.is_some() {
            return Ok(());
        }

        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("start() requires a tokio runtime: {e}")))?;
        *supervisor = Some(runtime.spawn(supervisor::run(self.clone())));

        info!("Moonraker client started");
        Ok(())
    }
}

// ============================================================================
// MoonrakerClient - Requests
// ============================================================================

impl MoonrakerClient {
    /// Sends a JSON-RPC request and waits for its result.
    ///
    /// Only allowed once klippy is ready. Every failure is returned as a
    /// value; nothing here tears down the session.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no ready session or the write failed
    /// - [`Error::Timeout`] if no reply arrived within the request timeout
    /// - [`Error::RemoteError`] if Moonraker answered with an error object
    /// - [`Error::UnknownProtocol`] if the reply had neither `result` nor `error`
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.request(method, params, Gate::Ready).await
    }

    /// Sends on session `session` whether or not klippy is ready.
    ///
    /// Reserved for the readiness handshake.
    pub(crate) async fn force_send(
        &self,
        session: SessionId,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        self.request(method, params, Gate::Session(session)).await
    }

    async fn request(&self, method: &str, params: Option<Value>, gate: Gate) -> Result<Value> {
        let inner = &self.inner;

        if !inner.link.accepts(gate) {
            debug!(method, "Request rejected, no usable session");
            return Err(Error::NotConnected);
        }

        let pending = inner.correlation.register();
        let id = pending.id();
        let request = Request::new(id, method, params);

        let text = serde_json::to_string(&request).map_err(|e| {
            warn!(%id, method, error = %e, "Failed to serialize request");
            Error::NotConnected
        })?;

        inner.link.write(text, gate).map_err(|e| {
            debug!(%id, method, error = %e, "Failed to send request");
            Error::NotConnected
        })?;

        trace!(%id, method, "Request sent");

        let payload = pending
            .wait(inner.options.request_timeout)
            .await
            .inspect_err(|e| warn!(%id, method, error = %e, "Request failed"))?;

        Reply::new(payload).into_result()
    }

    /// Queries printer objects and returns `result.status`.
    ///
    /// # Errors
    ///
    /// Any [`send`](Self::send) error, or [`Error::Protocol`] if the result
    /// has no `status` object.
    pub async fn query_objects(&self, objects: &[&str]) -> Result<Value> {
        let mut result = self.send(OBJECTS_QUERY, Some(query_params(objects))).await?;

        match result.get_mut("status").map(Value::take) {
            Some(status @ Value::Object(_)) => Ok(status),
            _ => Err(Error::protocol(format!(
                "{OBJECTS_QUERY} result has no status object"
            ))),
        }
    }

    /// Returns the current `print_stats` snapshot.
    ///
    /// # Errors
    ///
    /// Any [`send`](Self::send) error, or [`Error::Protocol`] if a required
    /// field is missing.
    pub async fn current_print_stats(&self) -> Result<PrintStats> {
        let result = self
            .send(OBJECTS_QUERY, Some(query_params(&["print_stats"])))
            .await?;
        PrintStats::from_query_result(&result)
    }
}

// ============================================================================
// MoonrakerClient - Diagnostics
// ============================================================================

impl MoonrakerClient {
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.link.state()
    }

    /// Subscribes to connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.link.subscribe()
    }

    /// Returns `true` if a session is open and klippy is ready.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.link.is_ready()
    }

    /// Returns the number of requests awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.correlation.len()
    }

    /// Returns the client options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }
}

// ============================================================================
// Tests
// ============================================================================
