//! Fresh-connect resync.
//!
//! Runs after every transition into `Ready`. Either side may have restarted
//! mid-print, so the current `print_stats` is replayed to the sink, which
//! reconciles its own timers against it.

// ============================================================================
// Imports
// ============================================================================

use tracing::{info, warn};

use crate::client::MoonrakerClient;

// ============================================================================
// Resync
// ============================================================================

/// Replays the current print state to the sink.
///
/// A failed or incomplete snapshot is logged and skipped; the next status
/// notification corrects the state.
pub(crate) async fn run(client: &MoonrakerClient) {
    let stats = match client.current_print_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(error = %e, "Fresh-connect resync skipped, print_stats unavailable");
            return;
        }
    };

    info!(
        state = %stats.state,
        filename = stats.filename().unwrap_or(""),
        total_duration = stats.total_duration,
        "Restoring print state after connect"
    );

    client
        .inner
        .sink
        .on_restore_print_if_needed(&stats.state, stats.filename(), Some(stats.total_duration))
        .await;
}
