//! Turns caller requests into outbound protocol lines.
//!
//! # Request → wire
//!
//! ```text
//! set_level(5, 40.0)        →  #OUTPUT,5,1,40.00
//! query_level(5)            →  ?OUTPUT,5,1         (answer arrives as ~OUTPUT)
//! initialize_range(3)       →  ?OUTPUT,0,1  ?OUTPUT,1,1  ?OUTPUT,2,1
//! apply_bulk_state("D=3&L=20\r\n")  →  #OUTPUT,3,1,20.00
//! send_raw("?SYSTEM,1")     →  ?SYSTEM,1
//! ```
//!
//! None of these wait for the gateway to answer.  A query's result shows up
//! later in the device cache, once the listener has seen the `~OUTPUT` event.

use std::sync::Arc;
use std::time::Duration;

use lutron_core::{format_device_states, parse_bulk_state, Command, DeviceCache, DeviceId};
use tracing::{debug, info, warn};

use crate::application::{BridgeError, GatewayLink};
use crate::domain::EventSink;

/// Builds and sends command lines, and provides the bulk operations.
pub struct CommandTranslator {
    link: Arc<dyn GatewayLink>,
    cache: Arc<DeviceCache>,
    sink: Arc<dyn EventSink>,
    scan_delay: Duration,
}

impl CommandTranslator {
    /// Creates a translator writing through `link`.
    pub fn new(
        link: Arc<dyn GatewayLink>,
        cache: Arc<DeviceCache>,
        sink: Arc<dyn EventSink>,
        scan_delay: Duration,
    ) -> Self {
        Self {
            link,
            cache,
            sink,
            scan_delay,
        }
    }

    /// Sends `#OUTPUT,<id>,1,<level>`.  The level is not range-checked.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] or [`BridgeError::Io`] from the
    /// underlying write.
    pub async fn set_level(&self, device_id: DeviceId, level: f64) -> Result<(), BridgeError> {
        self.send(Command::SetLevel { device_id, level }).await
    }

    /// Sends `?OUTPUT,<id>,1`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] or [`BridgeError::Io`] from the
    /// underlying write.
    pub async fn query_level(&self, device_id: DeviceId) -> Result<(), BridgeError> {
        self.send(Command::QueryLevel { device_id }).await
    }

    /// Sends an arbitrary protocol line.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] or [`BridgeError::Io`] from the
    /// underlying write.
    pub async fn send_raw(&self, line: &str) -> Result<(), BridgeError> {
        self.send(Command::raw(line)).await
    }

    /// Queries every id in `0..max_id`, one at a time, pausing `scan_delay`
    /// after each so the gateway's input buffer does not overrun.
    ///
    /// The protocol offers no way to list outputs, so this is how the cache
    /// gets primed.  Ids with no device simply never answer.
    ///
    /// Returns the number of queries sent.
    ///
    /// # Errors
    ///
    /// Stops at the first failed write and returns its error.
    pub async fn initialize_range(&self, max_id: DeviceId) -> Result<u32, BridgeError> {
        info!("probing output ids 0..{max_id}");
        for device_id in 0..max_id {
            self.query_level(device_id).await?;
            tokio::time::sleep(self.scan_delay).await;
        }
        Ok(max_id)
    }

    /// Parses a `D=<id>&L=<level>` batch and sets each level in order.
    ///
    /// Parsing stops quietly at the first malformed token.  Returns the number
    /// of levels sent.
    ///
    /// # Errors
    ///
    /// Stops at the first failed write and returns its error.
    pub async fn apply_bulk_state(&self, spec: &str) -> Result<usize, BridgeError> {
        let assignments = parse_bulk_state(spec);
        for assignment in &assignments {
            self.set_level(assignment.device_id, assignment.level).await?;
        }
        debug!("applied {} bulk level assignments", assignments.len());
        Ok(assignments.len())
    }

    /// Describes the whole cache as `D=<id>&L=<level>` lines in id order and
    /// forwards the same text to the event sink as a batch notification.
    pub fn describe_all_devices(&self) -> String {
        let batch = format_device_states(&self.cache.snapshot());
        self.sink.all_devices(&batch);
        batch
    }

    async fn send(&self, command: Command) -> Result<(), BridgeError> {
        debug!("sending command: {command}");
        self.link.send(&command).await.map_err(|e| {
            warn!("command {command} not sent: {e}");
            e
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
