//! Unsolicited notification frames.
//!
//! Moonraker pushes notifications as JSON-RPC frames without an `id`:
//!
//! ```json
//! {
//!   "jsonrpc": "2.0",
//!   "method": "notify_status_update",
//!   "params": [ { "print_stats": { "state": "printing" } }, 1234.5 ]
//! }
//! ```
//!
//! `params` is a heterogeneous array. Topic objects are looked up by key,
//! scanning left to right; the first object holding the key wins.
//!
//! # Recognized methods
//!
//! | Method | Kind |
//! |--------|------|
//! | `notify_klippy_disconnected` | [`NotificationKind::KlippyDisconnected`] |
//! | `notify_history_changed` | [`NotificationKind::HistoryChanged`] |
//! | `notify_status_update` | [`NotificationKind::StatusUpdate`] |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

// ============================================================================
// NotificationKind
// ============================================================================

/// Notification methods the bridge reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Klippy is restarting; the session must be dropped.
    KlippyDisconnected,
    /// A job was added to or removed from the history.
    HistoryChanged,
    /// Subscribed printer objects changed.
    StatusUpdate,
    /// Anything else.
    Other,
}

impl NotificationKind {
    /// Maps a method name to its kind, ignoring ASCII case.
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        if method.eq_ignore_ascii_case("notify_klippy_disconnected") {
            Self::KlippyDisconnected
        } else if method.eq_ignore_ascii_case("notify_history_changed") {
            Self::HistoryChanged
        } else if method.eq_ignore_ascii_case("notify_status_update") {
            Self::StatusUpdate
        } else {
            Self::Other
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A decoded notification. Read-only once enqueued.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    /// Notification method name.
    pub method: String,

    /// Parameter array (left as raw JSON; not always an array).
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    /// Creates a notification from its parts.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Builds a notification from a frame that had no `id`.
    ///
    /// Returns `None` if the frame has no string `method`.
    #[must_use]
    pub fn from_frame(mut frame: Map<String, Value>) -> Option<Self> {
        let method = match frame.remove("method") {
            Some(Value::String(method)) => method,
            _ => return None,
        };
        let params = frame.remove("params").unwrap_or(Value::Null);
        Some(Self { method, params })
    }

    /// Returns the notification kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        NotificationKind::from_method(&self.method)
    }

    /// Returns the value stored under `key` in the first params object
    /// that has it.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params
            .as_array()?
            .iter()
            .filter_map(Value::as_object)
            .find_map(|object| object.get(key))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_kind_from_method() {
        assert_eq!(
            NotificationKind::from_method("notify_klippy_disconnected"),
            NotificationKind::KlippyDisconnected
        );
        assert_eq!(
            NotificationKind::from_method("NOTIFY_HISTORY_CHANGED"),
            NotificationKind::HistoryChanged
        );
        assert_eq!(
            NotificationKind::from_method("notify_status_update"),
            NotificationKind::StatusUpdate
        );
        assert_eq!(
            NotificationKind::from_method("notify_proc_stat_update"),
            NotificationKind::Other
        );
    }

    #[test]
    fn test_from_frame() {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "notify_status_update",
            "params": [{ "virtual_sdcard": { "progress": 0.25 } }, 100.0]
        });
        let Value::Object(frame) = frame else {
            unreachable!()
        };

        let notification = Notification::from_frame(frame).expect("has method");
        assert_eq!(notification.kind(), NotificationKind::StatusUpdate);
        assert_eq!(
            notification.param("virtual_sdcard"),
            Some(&json!({ "progress": 0.25 }))
        );
    }

    #[test]
    fn test_from_frame_without_method() {
        let Value::Object(frame) = json!({ "params": [] }) else {
            unreachable!()
        };
        assert!(Notification::from_frame(frame).is_none());
    }

    #[test]
    fn test_param_first_match_wins() {
        let notification = Notification::new(
            "notify_status_update",
            json!([
                "not an object",
                { "print_stats": { "state": "paused" } },
                { "print_stats": { "state": "printing" } }
            ]),
        );

        assert_eq!(
            notification.param("print_stats"),
            Some(&json!({ "state": "paused" }))
        );
        assert_eq!(notification.param("webhooks"), None);
    }

    #[test]
    fn test_param_with_non_array_params() {
        let notification = Notification::new("notify_status_update", json!({ "a": 1 }));
        assert_eq!(notification.param("a"), None);

        let notification: Notification =
            serde_json::from_str(r#"{"method":"notify_klippy_ready"}"#).expect("parse");
        assert!(notification.params.is_null());
        assert_eq!(notification.param("anything"), None);
    }
}
