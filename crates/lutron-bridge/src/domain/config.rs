//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It can be built from the TOML config file and CLI arguments (see
//! `infrastructure::config_file` and `main.rs`) or from defaults, which is
//! what the tests do.
//!
//! # Why so many fixed delays?
//!
//! The gateway's telnet service runs on modest embedded hardware.  It never
//! acknowledges a login, its input buffer overruns if commands arrive
//! back-to-back, and polling it in a tight loop starves it.  Each delay below
//! is a rate throttle, not a retry backoff.

use std::net::SocketAddr;
use std::time::Duration;

use lutron_core::protocol::frame::DEFAULT_MAX_PENDING;
use lutron_core::protocol::TELNET_PORT;
use lutron_core::DEFAULT_ON_LEVEL;

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use lutron_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.gateway_addr.port(), 23);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address of the gateway's telnet integration port.
    pub gateway_addr: SocketAddr,

    /// Upper bound on the TCP connect.
    pub connect_timeout: Duration,

    /// How long to wait after sending the login lines before treating the
    /// session as connected.  The gateway sends no explicit acknowledgement.
    pub login_settle: Duration,

    /// Sleep between two drains of the socket in the listener loop.
    pub poll_interval: Duration,

    /// Delay between two probes in `initialize_range`.
    pub scan_delay: Duration,

    /// `on_level` given to a device first seen through a change event.
    pub default_on_level: f64,

    /// Largest unterminated event line the parser will hold before dropping it.
    pub max_pending_bytes: usize,

    /// Depth of the broadcast channel feeding change subscribers.  A
    /// subscriber that falls further behind than this skips ahead.
    pub event_capacity: usize,

    /// Whether level changes are forwarded to the event sink.  Subscribers
    /// and the cache are updated either way.
    pub publish_changes: bool,
}

impl Default for BridgeConfig {
    /// | Field             | Default          |
    /// |-------------------|------------------|
    /// | gateway_addr      | `127.0.0.1:23`   |
    /// | connect_timeout   | 10 seconds       |
    /// | login_settle      | 1 second         |
    /// | poll_interval     | 250 ms           |
    /// | scan_delay        | 50 ms            |
    /// | default_on_level  | 100.0            |
    /// | max_pending_bytes | 4096             |
    /// | event_capacity    | 64               |
    /// | publish_changes   | `true`           |
    fn default() -> Self {
        Self {
            gateway_addr: SocketAddr::from(([127, 0, 0, 1], TELNET_PORT)),
            connect_timeout: Duration::from_secs(10),
            login_settle: Duration::from_secs(1),
            poll_interval: Duration::from_millis(250),
            scan_delay: Duration::from_millis(50),
            default_on_level: DEFAULT_ON_LEVEL,
            max_pending_bytes: DEFAULT_MAX_PENDING,
            event_capacity: 64,
            publish_changes: true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
