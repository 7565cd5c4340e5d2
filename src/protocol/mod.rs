//! Moonraker JSON-RPC message types.
//!
//! This module defines the frames exchanged with Moonraker over its
//! websocket and typed views of the printer objects the bridge reads.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Request`] | Client → Moonraker | JSON-RPC call with an `id` |
//! | [`Reply`] | Moonraker → Client | Result or error for that `id` |
//! | [`Notification`] | Moonraker → Client | Unsolicited `notify_*` frame |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `notification` | Notification frames and kinds |
//! | `objects` | Printer objects and query parameters |
//! | `request` | Request and Reply types |

// ============================================================================
// Submodules
// ============================================================================

/// Notification frames.
pub mod notification;

/// Printer objects and query parameters.
pub mod objects;

/// Request and Reply message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use notification::{Notification, NotificationKind};
pub use objects::{KlippyState, PrintState, PrintStats};
pub use request::{Reply, Request};
