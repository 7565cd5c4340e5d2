//! Moonraker client.
//!
//! This module provides the main entry point: a persistent client that
//! owns the websocket lifecycle and exposes a request/response interface.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MoonrakerClient`] | Request API and lifecycle owner |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timeouts, delays and capacities |
//! | [`ConnectionState`] | Observable connection state |
//!
//! # Tasks
//!
//! | Task | Lifetime | Role |
//! |------|----------|------|
//! | supervisor | process | connect, run, reconnect |
//! | session loop | session | read and write the socket |
//! | handshake | until ready | poll klippy, subscribe, resync |
//! | dispatch worker | session | notifications to sink |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Klippy readiness handshake.
mod handshake;

/// Current session slot and connection state.
pub mod link;

/// Client timing and capacity options.
pub mod options;

/// Reconnect loop.
mod supervisor;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::MoonrakerClient;
pub use link::ConnectionState;
pub use options::ClientOptions;
