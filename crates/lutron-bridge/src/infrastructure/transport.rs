//! Byte transports underneath the gateway session.
//!
//! # Why a trait?
//!
//! The session logic (login, serialization, EOF handling) is the same whether
//! the bytes travel over a real socket or an in-memory buffer.  Putting the
//! socket behind [`Transport`] lets the tests drive a full session through
//! `infrastructure::mock::MemoryTransport` and inspect the exact bytes that
//! would have reached the wire.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::application::BridgeError;

/// A bidirectional byte stream to the gateway.
#[async_trait]
pub trait Transport: Send {
    /// Writes every byte of `bytes`, waiting for the socket as needed.
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Copies already-buffered bytes into `buf` without waiting.
    ///
    /// Returns `Ok(0)` when the peer has closed the connection and an error
    /// of kind [`io::ErrorKind::WouldBlock`] when nothing is buffered.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Closes the write side and releases the connection.
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// [`Transport`] over a Tokio TCP stream.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Opens a TCP connection to `addr`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ConnectTimeout`] if the handshake does not
    /// finish in time and [`BridgeError::ConnectFailed`] if it is refused.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, BridgeError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| BridgeError::ConnectTimeout { addr, timeout })?
            .map_err(|source| BridgeError::ConnectFailed { addr, source })?;

        // Command lines are tiny; send each one immediately.
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
