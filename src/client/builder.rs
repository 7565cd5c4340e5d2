//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`MoonrakerClient`]
//! instances.
//!
//! # Example
//!
//! ```ignore
//! use moonraker_bridge::MoonrakerClient;
//!
//! let client = MoonrakerClient::builder()
//!     .config_file("/home/pi/printer_data/config/moonraker.conf")
//!     .sink(my_sink)
//!     .printer_id("printer-1")
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{MoonrakerConfigFile, ServerAddress, ServerAddressSource};
use crate::error::{Error, Result};
use crate::lifecycle::LifecycleSink;

use super::core::MoonrakerClient;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`MoonrakerClient`] instance.
///
/// Use [`MoonrakerClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Where Moonraker listens.
    address_source: Option<Arc<dyn ServerAddressSource>>,
    /// Lifecycle event consumer.
    sink: Option<Arc<dyn LifecycleSink>>,
    /// Printer identity forwarded to the sink.
    printer_id: Option<String>,
    /// Timing and capacity settings.
    options: ClientOptions,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("has_address_source", &self.address_source.is_some())
            .field("has_sink", &self.sink.is_some())
            .field("printer_id", &self.printer_id)
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address source, consulted once per connection attempt.
    #[inline]
    #[must_use]
    pub fn address_source(mut self, source: Arc<dyn ServerAddressSource>) -> Self {
        self.address_source = Some(source);
        self
    }

    /// Reads the address from Moonraker's config file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to `moonraker.conf`
    #[inline]
    #[must_use]
    pub fn config_file(self, path: impl Into<PathBuf>) -> Self {
        self.address_source(Arc::new(MoonrakerConfigFile::new(path)))
    }

    /// Uses a fixed address.
    #[inline]
    #[must_use]
    pub fn address(self, address: ServerAddress) -> Self {
        self.address_source(Arc::new(address))
    }

    /// Sets the lifecycle sink.
    #[inline]
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the printer id forwarded to the sink at build time.
    #[inline]
    #[must_use]
    pub fn printer_id(mut self, printer_id: impl Into<String>) -> Self {
        self.printer_id = Some(printer_id.into());
        self
    }

    /// Sets the client options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no address source or sink is set
    /// - [`Error::Config`] if a timing option is zero
    pub fn build(self) -> Result<MoonrakerClient> {
        let address_source = self.address_source.ok_or_else(|| {
            Error::config(
                "An address source is required. Use .config_file(), .address() or .address_source().",
            )
        })?;
        let sink = self
            .sink
            .ok_or_else(|| Error::config("A lifecycle sink is required. Use .sink() to set it."))?;

        validate_options(&self.options)?;

        Ok(MoonrakerClient::new(
            self.options,
            address_source,
            sink,
            self.printer_id,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_options(options: &ClientOptions) -> Result<()> {
    let durations = [
        ("request_timeout", options.request_timeout),
        ("connect_timeout", options.connect_timeout),
        ("klippy_poll_interval", options.klippy_poll_interval),
    ];

    if let Some((name, _)) = durations.iter().find(|(_, value)| value.is_zero()) {
        return Err(Error::config(format!("{name} must be greater than zero")));
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
