//! The error type shared by every caller-facing bridge operation.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by session and command operations.
///
/// A failed command is never retried; the error is simply reported to the
/// caller, who decides whether to reconnect.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A command was attempted while no logged-in session exists.
    #[error("not connected to the gateway")]
    NotConnected,

    /// `connect` was called while a session is already open.
    #[error("a gateway session is already open")]
    AlreadyConnected,

    /// The TCP connection to the gateway could not be established.
    #[error("failed to connect to gateway at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The TCP connect did not complete in time.
    #[error("timed out after {timeout:?} connecting to gateway at {addr}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    /// The connection failed while writing.
    #[error("gateway I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_message() {
        assert_eq!(BridgeError::NotConnected.to_string(), "not connected to the gateway");
    }

    #[test]
    fn test_connect_failed_message_includes_address() {
        let err = BridgeError::ConnectFailed {
            addr: "10.0.0.5:23".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.to_string().contains("10.0.0.5:23"));
    }

    #[test]
    fn test_io_error_converts() {
        let err: BridgeError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
