//! TOML config file for the bridge binary.
//!
//! Looked up at an explicit `--config` path, or else in the platform config
//! directory:
//! - Windows:  `%APPDATA%\LutronBridge\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/lutron-bridge/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/LutronBridge/config.toml`
//!
//! Every field is optional; a missing file is the same as an empty one.
//!
//! ```toml
//! [gateway]
//! host = "192.168.1.40"
//! port = 23
//! connect_timeout_ms = 10000
//! login_settle_ms = 1000
//!
//! [listener]
//! poll_interval_ms = 250
//! default_on_level = 100.0
//! max_pending_bytes = 4096
//! event_capacity = 64
//! publish_changes = true
//!
//! [scan]
//! on_connect = 90      # query ids 0..90 right after connecting
//! delay_ms = 50
//!
//! [logging]
//! level = "info"
//! ```

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lutron_core::protocol::frame::DEFAULT_MAX_PENDING;
use lutron_core::protocol::TELNET_PORT;
use lutron_core::{DeviceId, DEFAULT_ON_LEVEL};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::BridgeConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `gateway.host` is not an IP address.
    #[error("invalid gateway host {host:?}: {source}")]
    InvalidAddress {
        host: String,
        #[source]
        source: AddrParseError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub listener: ListenerSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Where the gateway is and how to log in.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewaySection {
    /// IP literal of the gateway.  Host names are not resolved.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_login_settle_ms")]
    pub login_settle_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListenerSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_on_level")]
    pub default_on_level: f64,
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_true")]
    pub publish_changes: bool,
}

/// Cache priming.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScanSection {
    /// When set, the binary queries ids `0..on_connect` after connecting.
    #[serde(default)]
    pub on_connect: Option<DeviceId>,
    #[serde(default = "default_scan_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    TELNET_PORT
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_login_settle_ms() -> u64 {
    1_000
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_on_level() -> f64 {
    DEFAULT_ON_LEVEL
}
fn default_max_pending_bytes() -> usize {
    DEFAULT_MAX_PENDING
}
fn default_event_capacity() -> usize {
    64
}
fn default_true() -> bool {
    true
}
fn default_scan_delay_ms() -> u64 {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            login_settle_ms: default_login_settle_ms(),
        }
    }
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_on_level: default_on_level(),
            max_pending_bytes: default_max_pending_bytes(),
            event_capacity: default_event_capacity(),
            publish_changes: default_true(),
        }
    }
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            on_connect: None,
            delay_ms: default_scan_delay_ms(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl FileConfig {
    /// Converts the file layout into runtime settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `gateway.host` is not an IP
    /// literal.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let ip: IpAddr = self
            .gateway
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidAddress {
                host: self.gateway.host.clone(),
                source,
            })?;

        Ok(BridgeConfig {
            gateway_addr: SocketAddr::new(ip, self.gateway.port),
            connect_timeout: Duration::from_millis(self.gateway.connect_timeout_ms),
            login_settle: Duration::from_millis(self.gateway.login_settle_ms),
            poll_interval: Duration::from_millis(self.listener.poll_interval_ms),
            scan_delay: Duration::from_millis(self.scan.delay_ms),
            default_on_level: self.listener.default_on_level,
            max_pending_bytes: self.listener.max_pending_bytes,
            // A zero-capacity broadcast channel panics on creation.
            event_capacity: self.listener.event_capacity.max(1),
            publish_changes: self.listener.publish_changes,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for this platform.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from `path`, or from [`config_file_path`] when `None`.
/// A file that does not exist yields `FileConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LutronBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lutron-bridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LutronBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
