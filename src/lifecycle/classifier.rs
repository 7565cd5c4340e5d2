//! Notification classifier.
//!
//! Pure mapping from one [`Notification`] to the lifecycle events it
//! implies. No I/O happens here.
//!
//! # Rules
//!
//! | Method | Condition | Events |
//! |--------|-----------|--------|
//! | `notify_klippy_disconnected` | always | close the session |
//! | `notify_history_changed` | `action == "added"` with `job.filename` | `Started` |
//! | `notify_status_update` | `print_stats.state == "paused"` | `Paused` |
//! | `notify_status_update` | `printing` and progress unknown or above epsilon | `Resumed` |
//! | `notify_status_update` | `virtual_sdcard.progress` present | `Progress` (last) |
//!
//! A transition to `printing` at near zero progress is the tail of the start
//! sequence, already reported by the history event, so it is not a resume.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{Notification, NotificationKind, PrintState};

use super::LifecycleEvent;

// ============================================================================
// Constants
// ============================================================================

/// Progress at or below this is not treated as a resume.
pub const RESUME_PROGRESS_EPSILON: f64 = 0.0001;

/// History action announcing a new job.
const HISTORY_ACTION_ADDED: &str = "added";

// ============================================================================
// Classification
// ============================================================================

/// Outcome of classifying one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Nothing to do.
    Ignore,
    /// The session must be closed.
    CloseSession,
    /// Events to deliver, in order.
    Events(Vec<LifecycleEvent>),
}

impl Classification {
    /// Returns the events, or an empty slice.
    #[must_use]
    pub fn events(&self) -> &[LifecycleEvent] {
        match self {
            Self::Events(events) => events,
            _ => &[],
        }
    }
}

// ============================================================================
// classify
// ============================================================================

/// Classifies one notification.
///
/// Unrecognized methods are ignored.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if `virtual_sdcard.progress` is present but
/// not a number.
pub fn classify(notification: &Notification) -> Result<Classification> {
    match notification.kind() {
        NotificationKind::KlippyDisconnected => Ok(Classification::CloseSession),
        NotificationKind::HistoryChanged => Ok(classify_history(notification)),
        NotificationKind::StatusUpdate => classify_status(notification),
        NotificationKind::Other => Ok(Classification::Ignore),
    }
}

fn classify_history(notification: &Notification) -> Classification {
    let added = notification
        .param("action")
        .and_then(Value::as_str)
        .is_some_and(|action| action == HISTORY_ACTION_ADDED);
    if !added {
        return Classification::Ignore;
    }

    match notification
        .param("job")
        .and_then(|job| job.get("filename"))
        .and_then(Value::as_str)
    {
        Some(filename) => Classification::Events(vec![LifecycleEvent::Started {
            filename: filename.to_string(),
        }]),
        None => Classification::Ignore,
    }
}

fn classify_status(notification: &Notification) -> Result<Classification> {
    let progress = extract_progress(notification)?;
    let state = notification
        .param("print_stats")
        .and_then(|stats| stats.get("state"))
        .and_then(Value::as_str)
        .map(PrintState::parse);

    let mut events = Vec::with_capacity(2);

    match state {
        Some(PrintState::Paused) => events.push(LifecycleEvent::Paused),
        Some(PrintState::Printing)
            if progress.is_none_or(|progress| progress > RESUME_PROGRESS_EPSILON) =>
        {
            events.push(LifecycleEvent::Resumed);
        }
        _ => {}
    }

    if let Some(progress) = progress {
        events.push(LifecycleEvent::Progress {
            percent: progress * 100.0,
        });
    }

    if events.is_empty() {
        Ok(Classification::Ignore)
    } else {
        Ok(Classification::Events(events))
    }
}

/// Reads `virtual_sdcard.progress` (0.0 to 1.0).
fn extract_progress(notification: &Notification) -> Result<Option<f64>> {
    let Some(raw) = notification
        .param("virtual_sdcard")
        .and_then(|sdcard| sdcard.get("progress"))
    else {
        return Ok(None);
    };

    match raw {
        Value::Null => Ok(None),
        value => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| {
                Error::protocol(format!("virtual_sdcard.progress is not a number: {value}"))
            }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    fn status(params: Value) -> Notification {
        Notification::new("notify_status_update", params)
    }

    fn events(notification: &Notification) -> Vec<LifecycleEvent> {
        classify(notification).expect("classify").events().to_vec()
    }

    #[test]
    fn test_history_added_starts_print() {
        let n = Notification::new(
            "notify_history_changed",
            json!([{ "action": "added", "job": { "filename": "test.gcode", "status": "in_progress" } }]),
        );
        assert_eq!(
            events(&n),
            vec![LifecycleEvent::Started {
                filename: "test.gcode".into()
            }]
        );
    }

    #[test]
    fn test_history_finished_is_ignored() {
        let n = Notification::new(
            "notify_history_changed",
            json!([{ "action": "finished", "job": { "filename": "test.gcode" } }]),
        );
        assert_eq!(classify(&n).expect("classify"), Classification::Ignore);
    }

    #[test]
    fn test_history_without_filename_is_ignored() {
        let n = Notification::new(
            "notify_history_changed",
            json!([{ "action": "added", "job": { "job_id": "0001" } }]),
        );
        assert_eq!(classify(&n).expect("classify"), Classification::Ignore);
    }

    #[test]
    fn test_near_zero_progress_is_not_resume() {
        let n = status(json!([{
            "print_stats": { "state": "printing" },
            "virtual_sdcard": { "progress": 0.00005 }
        }]));
        let events = events(&n);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            LifecycleEvent::Progress { percent } if (percent - 0.005).abs() < 1e-9
        ));
    }

    #[test]
    fn test_printing_with_progress_resumes_then_reports() {
        let n = status(json!([{
            "print_stats": { "state": "printing" },
            "virtual_sdcard": { "progress": 0.5 }
        }]));
        assert_eq!(
            events(&n),
            vec![
                LifecycleEvent::Resumed,
                LifecycleEvent::Progress { percent: 50.0 }
            ]
        );
    }

    #[test]
    fn test_printing_without_progress_resumes() {
        let n = status(json!([{ "print_stats": { "state": "printing" } }, 1234.5]));
        assert_eq!(events(&n), vec![LifecycleEvent::Resumed]);
    }

    #[test]
    fn test_paused_never_resumes() {
        let n = status(json!([{
            "print_stats": { "state": "paused" },
            "virtual_sdcard": { "progress": 0.75 }
        }]));
        assert_eq!(
            events(&n),
            vec![
                LifecycleEvent::Paused,
                LifecycleEvent::Progress { percent: 75.0 }
            ]
        );
    }

    #[test]
    fn test_first_matching_param_wins() {
        let n = status(json!([
            12.0,
            { "virtual_sdcard": { "progress": 0.25 } },
            { "virtual_sdcard": { "progress": 0.9 } }
        ]));
        assert_eq!(events(&n), vec![LifecycleEvent::Progress { percent: 25.0 }]);
    }

    #[test]
    fn test_progress_in_separate_object() {
        let n = status(json!([
            { "print_stats": { "state": "paused" } },
            { "virtual_sdcard": { "progress": 0.1 } }
        ]));
        assert_eq!(events(&n).first(), Some(&LifecycleEvent::Paused));
        assert_eq!(events(&n).len(), 2);
    }

    #[test]
    fn test_non_numeric_progress_is_error() {
        let n = status(json!([{ "virtual_sdcard": { "progress": "half" } }]));
        assert!(matches!(classify(&n), Err(Error::Protocol { .. })));
    }

    #[test]
    fn test_unrelated_status_is_ignored() {
        let n = status(json!([{ "webhooks": { "state": "ready" } }]));
        assert_eq!(classify(&n).expect("classify"), Classification::Ignore);
    }

    #[test]
    fn test_unknown_method_is_ignored() {
        let n = Notification::new("notify_proc_stat_update", json!([{ "cpu_temp": 40.0 }]));
        assert_eq!(classify(&n).expect("classify"), Classification::Ignore);
    }

    #[test]
    fn test_klippy_disconnected_closes() {
        let n = Notification::new("notify_klippy_disconnected", Value::Null);
        assert_eq!(classify(&n).expect("classify"), Classification::CloseSession);
    }

    proptest! {
        #[test]
        fn prop_progress_is_always_last(progress in 0.0f64..=1.0, paused in any::<bool>()) {
            let state = if paused { "paused" } else { "printing" };
            let n = status(json!([{
                "print_stats": { "state": state },
                "virtual_sdcard": { "progress": progress }
            }]));
            let events = events(&n);
            let last = events.last().cloned();
            prop_assert_eq!(last, Some(LifecycleEvent::Progress { percent: progress * 100.0 }));
        }

        #[test]
        fn prop_resume_only_above_epsilon(progress in 0.0f64..=1.0) {
            let n = status(json!([{
                "print_stats": { "state": "printing" },
                "virtual_sdcard": { "progress": progress }
            }]));
            let resumed = events(&n).contains(&LifecycleEvent::Resumed);
            prop_assert_eq!(resumed, progress > RESUME_PROGRESS_EPSILON);
        }

        #[test]
        fn prop_paused_never_emits_resume(progress in proptest::option::of(0.0f64..=1.0)) {
            let mut update = json!({ "print_stats": { "state": "paused" } });
            if let Some(progress) = progress {
                update["virtual_sdcard"] = json!({ "progress": progress });
            }
            let events = events(&status(json!([update])));
            prop_assert_eq!(events.first(), Some(&LifecycleEvent::Paused));
            prop_assert!(!events.contains(&LifecycleEvent::Resumed));
        }
    }
}
