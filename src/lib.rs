//! Moonraker bridge - Klipper print lifecycle events over JSON-RPC.
//!
//! This library keeps a persistent websocket session to Moonraker (the
//! Klipper API server), exposes a request/response interface over it, and
//! turns Moonraker's subscription notifications into print lifecycle
//! events for a notification relay.
//!
//! # Architecture
//!
//! ```text
//! caller ──► correlation table ──► session ──► Moonraker
//!                  ▲                  │
//!                  └──── reply ◄──────┤
//!                                     └── notification ──► queue ──► classifier ──► sink
//! ```
//!
//! Key design points:
//!
//! - One websocket at a time, reconnected after a fixed delay forever
//! - Normal requests wait until klippy reports `ready`
//! - Notifications are processed in arrival order by one worker per session
//! - Every (re)connect replays the current print state to the sink
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use moonraker_bridge::{MoonrakerClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = MoonrakerClient::builder()
//!         .config_file("/home/pi/printer_data/config/moonraker.conf")
//!         .sink(Arc::new(MyRelay::new()))
//!         .printer_id("printer-1")
//!         .build()?;
//!
//!     client.start("octo-key")?;
//!
//!     let status = client.job_status().await?;
//!     println!("{} {:.1}%", status.state, status.progress_percent);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`MoonrakerClient`], builder and options |
//! | [`config`] | Moonraker address sources |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`lifecycle`] | Lifecycle events, classifier and [`LifecycleSink`] |
//! | [`printer`] | Printer state queries and job status |
//! | [`protocol`] | JSON-RPC message types |
//! | [`transport`] | WebSocket session, correlation and queue |

// ============================================================================
// Modules
// ============================================================================

/// Moonraker client.
///
/// Use [`MoonrakerClient::builder()`] to create a configured client.
pub mod client;

/// Moonraker address configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Print lifecycle events.
pub mod lifecycle;

/// Printer state queries.
pub mod printer;

/// JSON-RPC message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Internal module handling the socket, reply correlation and the
/// notification queue.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientOptions, ConnectionState, MoonrakerClient};

// Config types
pub use config::{MoonrakerConfigFile, ServerAddress, ServerAddressSource};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SessionId};

// Lifecycle types
pub use lifecycle::{Classification, LifecycleEvent, LifecycleSink, classify};

// Printer types
pub use printer::{JobStatus, LifecycleState, PrinterStateProvider};

// Protocol types
pub use protocol::{KlippyState, Notification, NotificationKind, PrintState, PrintStats};
