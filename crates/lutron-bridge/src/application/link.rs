//! The seam between the application layer and the gateway connection.

use async_trait::async_trait;
use lutron_core::Command;
use tokio::sync::watch;

use crate::application::error::BridgeError;
use crate::domain::SessionState;

/// A serialized, line-oriented connection to the gateway.
///
/// `infrastructure::session::Session` is the production implementation.
/// Implementations must guarantee that bytes from two concurrent `send` calls
/// (or a `send` and a `read_available`) never interleave on the wire.
#[async_trait]
pub trait GatewayLink: Send + Sync {
    /// Writes one command line, terminator included.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] without writing anything if the
    /// session is not logged in, or [`BridgeError::Io`] if the write fails.
    async fn send(&self, command: &Command) -> Result<(), BridgeError>;

    /// Drains whatever bytes the transport has buffered, without waiting.
    /// Returns an empty vector when nothing is available.
    async fn read_available(&self) -> Vec<u8>;

    /// A receiver that observes every session state change.
    fn watch_state(&self) -> watch::Receiver<SessionState>;

    /// Non-blocking status check.
    fn is_connected(&self) -> bool {
        self.watch_state().borrow().is_connected()
    }
}
