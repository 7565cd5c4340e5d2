//! Print lifecycle events.
//!
//! Raw Moonraker notifications are reduced to four events (started, paused,
//! resumed, progress) and delivered to a [`LifecycleSink`] in wire order.
//!
//! # Flow
//!
//! ```text
//! receive loop ──► queue ──► dispatch worker ──► classify ──► LifecycleSink
//!                                                    ▲
//! handshake ready ──► resync ────────────────────────┘ (on_restore_print_if_needed)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `classifier` | Notification to event mapping |
//! | `dispatcher` | Per-session worker draining the queue |
//! | `resync` | State replay after every (re)connect |

// ============================================================================
// Submodules
// ============================================================================

/// Notification to lifecycle event mapping.
pub mod classifier;

/// Per-session dispatch worker.
pub mod dispatcher;

/// Fresh-connect resync.
pub mod resync;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

// ============================================================================
// Re-exports
// ============================================================================

pub use classifier::{Classification, RESUME_PROGRESS_EPSILON, classify};

// ============================================================================
// LifecycleEvent
// ============================================================================

/// A print lifecycle event derived from one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A job was added to the history and is starting.
    Started {
        /// File being printed.
        filename: String,
    },
    /// The job entered the `paused` state.
    Paused,
    /// The job is printing again after a pause.
    Resumed,
    /// Progress sample in percent (0 to 100).
    Progress {
        /// Percent complete.
        percent: f64,
    },
}

// ============================================================================
// LifecycleSink
// ============================================================================

/// Consumer of lifecycle events.
///
/// Implemented by the notification relay. Lifecycle events arrive from a
/// single worker per session, one at a time, in wire order.
/// [`on_restore_print_if_needed`](Self::on_restore_print_if_needed) is
/// called from the handshake task and may run concurrently with them.
#[async_trait]
pub trait LifecycleSink: Send + Sync {
    /// A new print started.
    async fn on_started(&self, filename: &str);

    /// The print was paused.
    async fn on_paused(&self, filename: Option<&str>);

    /// The print resumed.
    async fn on_resume(&self, filename: Option<&str>);

    /// New progress sample, in percent.
    async fn on_print_progress(&self, percent: f64);

    /// Current print state after a (re)connect.
    ///
    /// The sink reconciles its own timers against `state`, which may be a
    /// print already in progress.
    async fn on_restore_print_if_needed(
        &self,
        state: &str,
        filename: Option<&str>,
        total_duration_sec: Option<f64>,
    );

    /// Printer identity used when relaying events.
    fn set_printer_id(&self, _printer_id: &str) {}

    /// Account key used when relaying events.
    fn set_octo_key(&self, _octo_key: &str) {}
}
