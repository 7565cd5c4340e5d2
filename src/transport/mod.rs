//! WebSocket transport layer.
//!
//! This module owns the wire side of the bridge: one websocket session at a
//! time, the table pairing replies with callers, and the queue handing
//! notifications to the dispatch worker.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  MoonrakerClient │         WebSocket            │  Moonraker      │
//! │                  │◄────────────────────────────►│                 │
//! │  Session         │   ws://host:port/websocket   │  JSON-RPC 2.0   │
//! │   ├ Correlation  │                              │                 │
//! │   └ Queue ──► worker                            └─────────────────┘
//! └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket session and event loop |
//! | `correlation` | Request id to waiting caller map |
//! | `queue` | Bounded notification queue |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket session and event loop.
pub mod connection;

/// Request/response correlation table.
pub mod correlation;

/// Bounded notification queue.
pub mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{CloseReason, Session, SessionHandle};
pub use correlation::{CorrelationTable, PendingRequest};
pub use queue::{NotificationQueue, NotificationReceiver, notification_queue};
