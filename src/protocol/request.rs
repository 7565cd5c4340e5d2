//! JSON-RPC request and reply message types.
//!
//! Defines the frames exchanged with Moonraker for correlated round trips.
//! See <https://moonraker.readthedocs.io/en/latest/web_api/#json-rpc-api-overview>.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::error::{Error, Result, UNKNOWN_EXCEPTION_CODE};
use crate::identifiers::RequestId;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version tag carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Message used when a remote error carries no message.
const UNKNOWN_ERROR_MESSAGE: &str = "Unknown";

// ============================================================================
// Request
// ============================================================================

/// A request from the client to Moonraker.
///
/// # Format
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "method": "printer.objects.query",
///   "id": 12,
///   "params": { ... }
/// }
/// ```
///
/// `params` is omitted entirely when the method takes none.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,

    /// Method name, e.g. `server.info`.
    pub method: String,

    /// Correlation id.
    pub id: RequestId,

    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            id,
            params,
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A reply frame received for a request.
///
/// Kept as the raw object because classification depends on which members
/// are *present*, not on their values.
///
/// # Format
///
/// Success:
/// ```json
/// { "jsonrpc": "2.0", "id": 12, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "jsonrpc": "2.0", "id": 12, "error": { "code": 400, "message": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    payload: Map<String, Value>,
}

impl Reply {
    /// Wraps a decoded reply frame.
    #[inline]
    #[must_use]
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    /// Returns the raw payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Classifies the reply.
    ///
    /// - `error` present: [`Error::RemoteError`] with the payload's code and
    ///   message, falling back to the unknown-exception sentinel.
    /// - `result` present: the result value.
    /// - neither: [`Error::UnknownProtocol`].
    ///
    /// # Errors
    ///
    /// See above.
    pub fn into_result(mut self) -> Result<Value> {
        if let Some(error) = self.payload.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_i64)
                .unwrap_or(UNKNOWN_EXCEPTION_CODE);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_ERROR_MESSAGE);
            return Err(Error::remote(code, message));
        }

        if let Some(result) = self.payload.remove("result") {
            return Ok(result);
        }

        let payload = Value::Object(self.payload).to_string();
        error!(%payload, "Reply had neither an error nor a result object");
        Err(Error::unknown_protocol(payload))
    }
}

// ============================================================================
// Tests
// ============================================================================
