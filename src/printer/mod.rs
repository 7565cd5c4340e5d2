//! Printer state queries.
//!
//! [`PrinterStateProvider`] is the fixed capability set the notification
//! relay needs from the printer side. [`MoonrakerClient`] implements it by
//! querying printer objects on demand.
//!
//! | Method | Source |
//! |--------|--------|
//! | `print_time_remaining_secs` | `print_stats.print_duration`, `virtual_sdcard.progress` |
//! | `current_z_offset` | `gcode_move.homing_origin[2]` |
//! | `should_printing_timers_be_running` | `print_stats.state` |
//! | `is_print_warming_up` | `print_stats.state`, `print_stats.print_duration` |

// ============================================================================
// Submodules
// ============================================================================

/// Lifecycle state and job status.
pub mod status;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, warn};

use crate::client::MoonrakerClient;
use crate::protocol::PrintState;

// ============================================================================
// Re-exports
// ============================================================================

pub use status::{JobStatus, LifecycleState, estimate_time_remaining};

// ============================================================================
// PrinterStateProvider
// ============================================================================

/// Printer state the notification relay asks for.
///
/// Every method degrades to a documented fallback instead of failing.
#[async_trait]
pub trait PrinterStateProvider: Send + Sync {
    /// Estimated seconds left in the current print, `None` if unknown.
    async fn print_time_remaining_secs(&self) -> Option<i64>;

    /// Current Z offset, `None` if unknown.
    async fn current_z_offset(&self) -> Option<f64>;

    /// `true` only while printing. Also `true` if the state is unknown.
    async fn should_printing_timers_be_running(&self) -> bool;

    /// `true` while printing but still heating.
    async fn is_print_warming_up(&self) -> bool;
}

// ============================================================================
// MoonrakerClient - PrinterStateProvider
// ============================================================================

#[async_trait]
impl PrinterStateProvider for MoonrakerClient {
    async fn print_time_remaining_secs(&self) -> Option<i64> {
        let status = match self.query_objects(&["virtual_sdcard", "print_stats"]).await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "Failed to query print objects for time remaining");
                return None;
            }
        };

        let print_duration = status["print_stats"]["print_duration"].as_f64()?;
        let progress = status["virtual_sdcard"]["progress"].as_f64()?;
        estimate_time_remaining(print_duration, progress).map(|secs| secs as i64)
    }

    async fn current_z_offset(&self) -> Option<f64> {
        match self.query_objects(&["gcode_move"]).await {
            Ok(status) => status["gcode_move"]["homing_origin"]
                .get(2)
                .and_then(Value::as_f64),
            Err(e) => {
                warn!(error = %e, "Failed to query gcode_move for z offset");
                None
            }
        }
    }

    async fn should_printing_timers_be_running(&self) -> bool {
        match self.current_print_stats().await {
            Ok(stats) => stats.print_state() == PrintState::Printing,
            Err(e) => {
                warn!(error = %e, "Failed to get print state, keeping timers running");
                true
            }
        }
    }

    async fn is_print_warming_up(&self) -> bool {
        match self.current_print_stats().await {
            Ok(stats) => {
                stats.print_state() == PrintState::Printing
                    && stats.print_duration < status::WARMING_UP_THRESHOLD_SEC
            }
            Err(e) => {
                error!(error = %e, "Failed to query print_stats for warm-up check");
                false
            }
        }
    }
}
