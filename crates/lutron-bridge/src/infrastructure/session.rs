//! The gateway session: one TCP connection, logged in, shared by every task.
//!
//! # Lifecycle
//!
//! ```text
//!               connect()                 login lines written
//! Disconnected ──────────► Connecting ──► Authenticating ──(settle)──► Connected
//!      ▲                                        │                         │
//!      └──────── write failure during login ────┘                         │
//!      └──────────────── disconnect()  or  peer closed (EOF) ─────────────┘
//! ```
//!
//! The state lives in a `tokio::sync::watch` channel so the listener task can
//! sleep between polls and still wake the moment the session goes away.
//!
//! # Serialization
//!
//! The transport sits behind a single `tokio::sync::Mutex`.  Every command is
//! encoded into one buffer and written while holding the lock, and every
//! drain of the socket holds the same lock, so concurrent callers can never
//! interleave bytes on the wire.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use lutron_core::Command;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::application::{BridgeError, GatewayLink};
use crate::domain::SessionState;
use crate::infrastructure::transport::{TcpTransport, Transport};

/// Size of each `try_read` chunk when draining the socket.
const READ_CHUNK: usize = 1024;

/// A single logged-in connection to the gateway.
pub struct Session {
    transport: Mutex<Option<Box<dyn Transport>>>,
    state: watch::Sender<SessionState>,
    login_settle: Duration,
}

impl Session {
    /// Creates a disconnected session.  `login_settle` is how long to wait
    /// after sending the login lines before commands are accepted.
    pub fn new(login_settle: Duration) -> Self {
        Self {
            transport: Mutex::new(None),
            state: watch::Sender::new(SessionState::Disconnected),
            login_settle,
        }
    }

    /// Opens a TCP connection to `addr` and logs in.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::AlreadyConnected`] if a session is open or opening.
    /// - [`BridgeError::ConnectFailed`] / [`BridgeError::ConnectTimeout`] if
    ///   the TCP connection cannot be made.
    /// - [`BridgeError::Io`] if the login lines cannot be written.
    /// - [`BridgeError::NotConnected`] if [`Session::disconnect`] ran before
    ///   the login finished.
    ///
    /// On any error the session is left `Disconnected`.
    pub async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<(), BridgeError> {
        self.begin(SessionState::Connecting)?;
        info!("connecting to gateway at {addr}");

        let mut transport = match TcpTransport::connect(addr, timeout).await {
            Ok(transport) => transport,
            Err(e) => {
                // Only undo our own claim; a disconnect() may already have run.
                self.advance(SessionState::Connecting, SessionState::Disconnected);
                warn!("gateway connection failed: {e}");
                return Err(e);
            }
        };

        if !self.advance(SessionState::Connecting, SessionState::Authenticating) {
            debug!("connect to {addr} abandoned by disconnect");
            let _ = transport.shutdown().await;
            return Err(BridgeError::NotConnected);
        }
        self.login(Box::new(transport)).await
    }

    /// Logs in over an already-open transport.
    ///
    /// Used by tests and by callers that reach the gateway through something
    /// other than a plain TCP socket.
    ///
    /// # Errors
    ///
    /// Same as [`Session::connect`], minus the TCP errors.
    pub async fn attach(&self, transport: Box<dyn Transport>) -> Result<(), BridgeError> {
        self.begin(SessionState::Authenticating)?;
        self.login(transport).await
    }

    /// Claims the session for a new connection attempt.
    fn begin(&self, next: SessionState) -> Result<(), BridgeError> {
        if self.advance(SessionState::Disconnected, next) {
            Ok(())
        } else {
            Err(BridgeError::AlreadyConnected)
        }
    }

    /// Moves `from` → `to` atomically.  Returns `false`, changing nothing,
    /// when the session is no longer in `from`.
    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Writes the login lines.  The session must already be `Authenticating`.
    async fn login(&self, mut transport: Box<dyn Transport>) -> Result<(), BridgeError> {
        for line in Command::login_sequence() {
            if let Err(e) = transport.write_all(&line.encode()).await {
                warn!("login failed: {e}");
                let _ = transport.shutdown().await;
                self.advance(SessionState::Authenticating, SessionState::Disconnected);
                return Err(e.into());
            }
        }
        *self.transport.lock().await = Some(transport);

        // The gateway never acknowledges a login.
        tokio::time::sleep(self.login_settle).await;

        if self.advance(SessionState::Authenticating, SessionState::Connected) {
            info!("gateway session established");
            Ok(())
        } else {
            // disconnect() ran while we were settling.
            if let Some(mut stale) = self.transport.lock().await.take() {
                let _ = stale.shutdown().await;
            }
            Err(BridgeError::NotConnected)
        }
    }

    /// Sends one raw protocol line.  A missing CRLF terminator is added.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotConnected`] if the session is not logged in,
    /// [`BridgeError::Io`] if the write fails.
    pub async fn write(&self, line: &str) -> Result<(), BridgeError> {
        self.send(&Command::raw(line)).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Closes the connection.  Calling it on a closed session does nothing.
    pub async fn disconnect(&self) {
        let previous = self.state.send_replace(SessionState::Disconnected);
        let transport = self.transport.lock().await.take();
        if let Some(mut transport) = transport {
            if let Err(e) = transport.shutdown().await {
                debug!("error while closing gateway connection: {e}");
            }
        }
        if previous != SessionState::Disconnected {
            info!("gateway session closed");
        }
    }
}

#[async_trait]
impl GatewayLink for Session {
    async fn send(&self, command: &Command) -> Result<(), BridgeError> {
        if !self.state().is_connected() {
            return Err(BridgeError::NotConnected);
        }
        let bytes = command.encode();

        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(BridgeError::NotConnected)?;
        transport.write_all(&bytes).await?;
        Ok(())
    }

    async fn read_available(&self) -> Vec<u8> {
        let mut received = Vec::new();
        let mut guard = self.transport.lock().await;
        let Some(transport) = guard.as_mut() else {
            return received;
        };

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match transport.try_read(&mut chunk) {
                Ok(0) => {
                    info!("gateway closed the connection");
                    *guard = None;
                    self.state.send_replace(SessionState::Disconnected);
                    break;
                }
                Ok(n) => received.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("gateway read error: {e}");
                    break;
                }
            }
        }
        received
    }

    fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
