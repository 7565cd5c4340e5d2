//! Moonraker address configuration.
//!
//! The client resolves where Moonraker listens once per connection attempt
//! through a [`ServerAddressSource`]. The address is never cached across
//! attempts since Moonraker may come back on a different port.
//!
//! # Sources
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MoonrakerConfigFile`] | Reads `[server] host` / `port` from `moonraker.conf` |
//! | [`ServerAddress`] | A fixed address |
//!
//! # Example
//!
//! ```ignore
//! use moonraker_bridge::config::{MoonrakerConfigFile, ServerAddressSource};
//!
//! let source = MoonrakerConfigFile::new("/home/pi/printer_data/config/moonraker.conf");
//! let address = source.server_address()?;
//! println!("{}", address.ws_url()?);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Config section holding the listening address.
const SERVER_SECTION: &str = "server";

/// Host Moonraker binds to when nothing else is known.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port Moonraker binds to when nothing else is known.
pub const DEFAULT_PORT: u16 = 7125;

/// Matches `[section]` lines.
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[\s*([^\]]+?)\s*\]\s*$").expect("valid section regex")
});

/// Matches `key: value` and `key = value` lines.
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s:=#;\[][^:=]*?)\s*[:=]\s*(.*?)\s*$").expect("valid entry regex")
});

// ============================================================================
// ServerAddressSource
// ============================================================================

/// Where the client learns Moonraker's listening address.
pub trait ServerAddressSource: Send + Sync {
    /// Returns the current address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the address cannot be determined.
    fn server_address(&self) -> Result<ServerAddress>;
}

// ============================================================================
// ServerAddress
// ============================================================================

/// Host and port of a Moonraker instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerAddress {
    /// Creates an address.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the websocket endpoint, `ws://host:port/websocket`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host does not form a valid URL.
    pub fn ws_url(&self) -> Result<String> {
        let host = match self.host.as_str() {
            // Moonraker's "listen on everything" value; connect locally.
            "0.0.0.0" | "::" | "" => DEFAULT_HOST,
            host => host,
        };
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        let url = Url::parse(&format!("ws://{host}:{}/websocket", self.port))
            .map_err(|e| Error::config(format!("Invalid Moonraker address {self}: {e}")))?;
        Ok(url.into())
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl ServerAddressSource for ServerAddress {
    fn server_address(&self) -> Result<ServerAddress> {
        Ok(self.clone())
    }
}

// ============================================================================
// MoonrakerConfigFile
// ============================================================================

/// Reads the address from Moonraker's own config file on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoonrakerConfigFile {
    path: PathBuf,
}

impl MoonrakerConfigFile {
    /// Creates a source for the config file at `path`.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the config file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ServerAddressSource for MoonrakerConfigFile {
    fn server_address(&self) -> Result<ServerAddress> {
        if !self.path.exists() {
            return Err(Error::config(format!(
                "Moonraker config not found at {}",
                self.path.display()
            )));
        }

        let contents = fs::read_to_string(&self.path)?;
        parse_server_address(&contents)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Extracts `[server] host` and `port` from INI-style config text.
///
/// Both keys are required. Later duplicates override earlier ones.
///
/// # Errors
///
/// Returns [`Error::Config`] if either key is missing or the port is not
/// a valid TCP port.
pub fn parse_server_address(contents: &str) -> Result<ServerAddress> {
    let mut in_server = false;
    let mut host = None;
    let mut port = None;

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(section) = SECTION_RE.captures(line) {
            in_server = section[1].eq_ignore_ascii_case(SERVER_SECTION);
            continue;
        }

        if !in_server {
            continue;
        }

        if let Some(entry) = ENTRY_RE.captures(line) {
            let value = strip_inline_comment(&entry[2]);
            match entry[1].to_ascii_lowercase().as_str() {
                "host" => host = Some(value.to_string()),
                "port" => port = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let host = host.ok_or_else(|| Error::config("No host in the [server] section"))?;
    let port = port.ok_or_else(|| Error::config("No port in the [server] section"))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| Error::config(format!("Invalid [server] port {port:?}: {e}")))?;

    Ok(ServerAddress::new(host, port))
}

/// Drops a trailing `# comment` from a value.
fn strip_inline_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(index) => value[..index].trim_end(),
        None => value,
    }
}

// ============================================================================
// Tests
// ============================================================================
