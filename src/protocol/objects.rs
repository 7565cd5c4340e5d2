//! Printer object payloads and query parameters.
//!
//! Typed views over the parts of Moonraker's printer objects the bridge
//! reads. See <https://moonraker.readthedocs.io/en/latest/printer_objects/>.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

// ============================================================================
// Method Names
// ============================================================================

/// Server status query used by the readiness handshake.
pub const SERVER_INFO: &str = "server.info";

/// Printer object query.
pub const OBJECTS_QUERY: &str = "printer.objects.query";

/// Printer object subscription.
pub const OBJECTS_SUBSCRIBE: &str = "printer.objects.subscribe";

// ============================================================================
// Parameter Builders
// ============================================================================

/// Parameters for the subscription made once klippy is ready.
///
/// `print_stats` is narrowed to the fields the classifier reads; the other
/// topics are subscribed whole.
#[must_use]
pub fn subscription_params() -> Value {
    json!({
        "objects": {
            "print_stats": ["state", "filename", "message"],
            "webhooks": null,
            "virtual_sdcard": null,
            "history": null,
        }
    })
}

/// Parameters querying every field of each named object.
#[must_use]
pub fn query_params(objects: &[&str]) -> Value {
    let objects: serde_json::Map<String, Value> = objects
        .iter()
        .map(|name| ((*name).to_string(), Value::Null))
        .collect();
    json!({ "objects": objects })
}

// ============================================================================
// KlippyState
// ============================================================================

/// Klippy state as reported by `server.info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KlippyState {
    /// Firmware is ready to serve printer state.
    Ready,
    /// Firmware is starting.
    Startup,
    /// Firmware reported an error.
    Error,
    /// Firmware is shut down.
    Shutdown,
    /// Any other value.
    Unknown(String),
}

impl KlippyState {
    /// Parses a raw state string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ready" => Self::Ready,
            "startup" => Self::Startup,
            "error" => Self::Error,
            "shutdown" => Self::Shutdown,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Reads `klippy_state` from a `server.info` result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the field is missing or not a string.
    pub fn from_server_info(result: &Value) -> Result<Self> {
        result
            .get("klippy_state")
            .and_then(Value::as_str)
            .map(Self::parse)
            .ok_or_else(|| {
                Error::protocol(format!("No klippy_state in server.info result: {result}"))
            })
    }

    /// Returns `true` for states that are expected to turn into `ready`.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Startup | Self::Error | Self::Shutdown)
    }
}

impl fmt::Display for KlippyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Startup => f.write_str("startup"),
            Self::Error => f.write_str("error"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

// ============================================================================
// PrintState
// ============================================================================

/// `print_stats.state` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintState {
    /// No job loaded.
    Standby,
    /// A job is running (possibly still heating).
    Printing,
    /// The job is paused.
    Paused,
    /// The job finished.
    Complete,
    /// The job was cancelled.
    Cancelled,
    /// The job failed.
    Error,
    /// Unrecognized value.
    Unknown(String),
}

impl PrintState {
    /// Parses a raw state string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "standby" => Self::Standby,
            "printing" => Self::Printing,
            "paused" => Self::Paused,
            "complete" => Self::Complete,
            "cancelled" => Self::Cancelled,
            "error" => Self::Error,
            other => Self::Unknown(other.to_string()),
        }
    }
}

// ============================================================================
// PrintStats
// ============================================================================

/// A `print_stats` snapshot.
///
/// All four of `state`, `filename`, `print_duration` and `total_duration`
/// must be present; a partial object does not deserialize.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrintStats {
    /// Raw print state.
    pub state: String,

    /// Current file, empty when idle.
    pub filename: String,

    /// Seconds spent actually printing.
    pub print_duration: f64,

    /// Seconds since the job started, including heating and pauses.
    pub total_duration: f64,

    /// Status message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl PrintStats {
    /// Extracts the snapshot from a `printer.objects.query` result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `status.print_stats` is missing or
    /// lacks a required field.
    pub fn from_query_result(result: &Value) -> Result<Self> {
        let stats = result
            .get("status")
            .and_then(|status| status.get("print_stats"))
            .ok_or_else(|| Error::protocol("No status.print_stats in query result"))?;

        Self::deserialize(stats).map_err(|e| {
            Error::protocol(format!("print_stats missing required field ({e}): {stats}"))
        })
    }

    /// Returns the parsed print state.
    #[inline]
    #[must_use]
    pub fn print_state(&self) -> PrintState {
        PrintState::parse(&self.state)
    }

    /// Returns the filename, or `None` when no file is loaded.
    #[inline]
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        Some(self.filename.as_str()).filter(|name| !name.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================
