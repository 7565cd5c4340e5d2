//! Error types for the Moonraker bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Every request sent through the client resolves to a [`Result<T>`]. A
//! failed round trip is a value, not a panic, so callers check it before
//! reading the payload:
//!
//! ```ignore
//! use moonraker_bridge::{Error, Result};
//!
//! async fn example(client: &MoonrakerClient) -> Result<()> {
//!     match client.send("printer.info", None).await {
//!         Ok(info) => println!("{info}"),
//!         Err(Error::NotConnected) => println!("no session"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Request | [`Error::NotConnected`], [`Error::Timeout`], [`Error::RemoteError`], [`Error::UnknownProtocol`] |
//! | Session | [`Error::HandshakeFailure`], [`Error::QueueOverflow`], [`Error::Connection`], [`Error::Protocol`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Constants
// ============================================================================

/// Code reported when no usable websocket exists.
pub const NOT_CONNECTED_CODE: i64 = 99_990_001;

/// Code reported when a reply did not arrive in time.
pub const TIMEOUT_CODE: i64 = 99_990_002;

/// Code reported for local failures and for remote errors without a code.
pub const UNKNOWN_EXCEPTION_CODE: i64 = 99_990_003;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// The first four variants are what a caller of
/// [`MoonrakerClient::send`](crate::MoonrakerClient::send) can observe.
/// Session-level variants never cross the request boundary; they close the
/// owning session and the supervisor reconnects.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Request Errors
    // ========================================================================
    /// No usable websocket, or the session is not ready for normal traffic.
    #[error("No active websocket connected")]
    NotConnected,

    /// No reply arrived within the request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    Timeout {
        /// The request that timed out.
        request_id: RequestId,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// The daemon answered with a structured JSON-RPC error.
    #[error("Remote error {code}: {message}")]
    RemoteError {
        /// Error code from the payload.
        code: i64,
        /// Error message from the payload.
        message: String,
    },

    /// The reply carried neither `result` nor `error`.
    #[error("Reply had no result or error object: {payload}")]
    UnknownProtocol {
        /// The offending payload, serialized.
        payload: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The klippy readiness handshake failed.
    #[error("Klippy handshake failed: {message}")]
    HandshakeFailure {
        /// What went wrong.
        message: String,
    },

    /// The notification backlog exceeded its capacity.
    #[error("Notification queue overflow (capacity {capacity})")]
    QueueOverflow {
        /// Queue capacity at the time of the overflow.
        capacity: usize,
    },

    /// Opening the websocket failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Malformed frame or missing field.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a timeout error.
    #[inline]
    pub fn timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::Timeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::RemoteError {
            code,
            message: message.into(),
        }
    }

    /// Creates an unknown protocol error.
    #[inline]
    pub fn unknown_protocol(payload: impl Into<String>) -> Self {
        Self::UnknownProtocol {
            payload: payload.into(),
        }
    }

    /// Creates a handshake failure.
    #[inline]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::HandshakeFailure {
            message: message.into(),
        }
    }

    /// Creates a queue overflow error.
    #[inline]
    pub fn queue_overflow(capacity: usize) -> Self {
        Self::QueueOverflow { capacity }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Connection { .. } | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error tears down the session that raised it.
    #[inline]
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::HandshakeFailure { .. }
                | Self::QueueOverflow { .. }
                | Self::Protocol { .. }
                | Self::Json(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns the numeric code used when reporting this error as an RPC result.
    #[must_use]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::NotConnected => NOT_CONNECTED_CODE,
            Self::Timeout { .. } => TIMEOUT_CODE,
            Self::RemoteError { code, .. } => *code,
            _ => UNKNOWN_EXCEPTION_CODE,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::remote(404, "Method not found");
        assert_eq!(err.to_string(), "Remote error 404: Method not found");

        let err = Error::timeout(RequestId::new(7), 30_000);
        assert_eq!(err.to_string(), "Request 7 timed out after 30000ms");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing [server] host");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing [server] host"
        );
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::timeout(RequestId::new(1), 10).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::connection("refused").is_connection_error());
        assert!(!Error::remote(1, "x").is_connection_error());
    }

    #[test]
    fn test_is_session_fatal() {
        assert!(Error::handshake("unknown state").is_session_fatal());
        assert!(Error::queue_overflow(10).is_session_fatal());
        assert!(!Error::NotConnected.is_session_fatal());
        assert!(!Error::timeout(RequestId::new(1), 10).is_session_fatal());
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(Error::NotConnected.rpc_code(), NOT_CONNECTED_CODE);
        assert_eq!(
            Error::timeout(RequestId::new(1), 10).rpc_code(),
            TIMEOUT_CODE
        );
        assert_eq!(Error::remote(-32601, "nope").rpc_code(), -32601);
        assert_eq!(
            Error::unknown_protocol("{}").rpc_code(),
            UNKNOWN_EXCEPTION_CODE
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_session_fatal());
    }
}
