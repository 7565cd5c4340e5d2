//! Lifecycle state and job status.
//!
//! Derived per query from `print_stats`, `virtual_sdcard` and `gcode_move`.
//! Nothing here is cached beyond the query that produced it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::client::MoonrakerClient;
use crate::error::Result;
use crate::protocol::PrintState;

// ============================================================================
// Constants
// ============================================================================

/// Printing with less print time than this is still heating.
pub const WARMING_UP_THRESHOLD_SEC: f64 = 0.00001;

/// Projected totals below this are meaningless.
const MIN_PROJECTED_TOTAL_SEC: f64 = 0.0001;

/// Objects queried for a job status.
const JOB_STATUS_OBJECTS: [&str; 3] = ["print_stats", "gcode_move", "virtual_sdcard"];

// ============================================================================
// LifecycleState
// ============================================================================

/// Printer state as reported to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// No job running.
    Idle,
    /// Printing.
    Printing,
    /// Printing but still heating.
    #[serde(rename = "warmingup")]
    WarmingUp,
    /// Paused.
    Paused,
    /// Finished.
    Complete,
    /// Cancelled.
    Cancelled,
    /// Failed.
    Error,
}

impl LifecycleState {
    /// Derives the state from a raw `print_stats.state` and `print_duration`.
    ///
    /// Unknown states map to [`LifecycleState::Idle`] with a warning.
    #[must_use]
    pub fn derive(state: &PrintState, print_duration_sec: f64) -> Self {
        match state {
            PrintState::Standby => Self::Idle,
            PrintState::Printing if print_duration_sec < WARMING_UP_THRESHOLD_SEC => {
                Self::WarmingUp
            }
            PrintState::Printing => Self::Printing,
            PrintState::Paused => Self::Paused,
            PrintState::Complete => Self::Complete,
            PrintState::Cancelled => Self::Cancelled,
            PrintState::Error => Self::Error,
            PrintState::Unknown(raw) => {
                warn!(state = %raw, "Unknown print_stats state");
                Self::Idle
            }
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Printing => "printing",
            Self::WarmingUp => "warmingup",
            Self::Paused => "paused",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// JobStatus
// ============================================================================

/// Snapshot of the current job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    /// Derived lifecycle state.
    pub state: LifecycleState,
    /// Progress in percent (0 to 100).
    pub progress_percent: f64,
    /// Seconds spent actually printing.
    pub duration_sec: u64,
    /// Estimated seconds left, if known.
    pub time_left_sec: Option<u64>,
    /// Current file, empty when idle.
    pub file_name: String,
    /// Speed override factor from `gcode_move`, if reported.
    pub speed_factor: Option<f64>,
}

impl JobStatus {
    /// Builds a status from a `printer.objects.query` status object.
    ///
    /// Missing fields fall back to idle, zero, or unknown.
    #[must_use]
    pub fn from_status(status: &Value) -> Self {
        let stats = &status["print_stats"];

        let state = match stats.get("state").and_then(Value::as_str) {
            Some(raw) => LifecycleState::derive(
                &PrintState::parse(raw),
                stats["print_duration"].as_f64().unwrap_or(0.0),
            ),
            None => {
                warn!("Job status has no print_stats.state");
                LifecycleState::Idle
            }
        };

        let print_duration = stats["print_duration"].as_f64().unwrap_or(0.0);
        let progress = status["virtual_sdcard"]["progress"].as_f64();

        Self {
            state,
            progress_percent: progress.unwrap_or(0.0) * 100.0,
            duration_sec: print_duration.max(0.0) as u64,
            time_left_sec: progress
                .and_then(|progress| estimate_time_remaining(print_duration, progress))
                .map(|secs| secs.max(0.0) as u64),
            file_name: stats["filename"].as_str().unwrap_or_default().to_string(),
            speed_factor: status["gcode_move"]["speed_factor"].as_f64(),
        }
    }
}

// ============================================================================
// Estimates
// ============================================================================

/// Estimates seconds left from time printed and fractional progress.
///
/// Returns `None` when progress is zero or the projected total is
/// effectively zero, as at the very start of a print.
#[must_use]
pub fn estimate_time_remaining(print_duration_sec: f64, progress: f64) -> Option<f64> {
    if progress <= 0.0 {
        return None;
    }

    let total = print_duration_sec / progress;
    if !total.is_finite() || total < MIN_PROJECTED_TOTAL_SEC {
        return None;
    }

    Some(total - print_duration_sec)
}

// ============================================================================
// MoonrakerClient - Job Status
// ============================================================================

impl MoonrakerClient {
    /// Queries the printer and returns the current job status.
    ///
    /// # Errors
    ///
    /// Any [`send`](MoonrakerClient::send) error.
    pub async fn job_status(&self) -> Result<JobStatus> {
        let status = self.query_objects(&JOB_STATUS_OBJECTS).await?;
        Ok(JobStatus::from_status(&status))
    }
}

// ============================================================================
// Tests
// ============================================================================
