//! In-memory test doubles for the transport and the event sink.
//!
//! # Why an in-memory transport?
//!
//! A real gateway is rarely on the test machine's network, and a socket hides
//! exactly what the bridge wrote.  [`MemoryTransport`] records every written
//! byte in order and replays scripted inbound bytes, so tests can assert on
//! the raw wire image.
//!
//! To make interleaving bugs visible, `write_all` copies **one byte at a
//! time** and yields to the scheduler between bytes.  Two writers that were
//! not serialized by the session lock would produce a mixed-up wire image.
//!
//! # Usage in tests
//!
//! ```ignore
//! let transport = MemoryTransport::new();
//! bridge.attach(Box::new(transport.clone())).await?;
//!
//! transport.push_inbound(b"~OUTPUT,5,1,100.00\r\n");
//! // ... later
//! assert_eq!(transport.written_lines(), vec!["lutron", "integration"]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use lutron_core::DeviceId;

use crate::domain::EventSink;
use crate::infrastructure::transport::Transport;

#[derive(Debug, Default)]
struct Wire {
    written: Vec<u8>,
    inbound: VecDeque<u8>,
    peer_closed: bool,
    shut_down: bool,
    fail_writes: bool,
}

/// A [`Transport`] backed by shared in-memory buffers.
///
/// Clones share the same buffers, so a test keeps one clone for inspection
/// and hands another to the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    wire: Arc<Mutex<Wire>>,
}

impl MemoryTransport {
    /// Creates a transport with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `bytes` available to the next `try_read`.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.wire().inbound.extend(bytes);
    }

    /// Simulates the gateway closing the connection: once the inbound buffer
    /// is drained, `try_read` reports end-of-stream.
    pub fn close_from_peer(&self) {
        self.wire().peer_closed = true;
    }

    /// Makes every subsequent write fail with `BrokenPipe`.
    pub fn fail_writes(&self) {
        self.wire().fail_writes = true;
    }

    /// Every byte written so far.
    pub fn written(&self) -> Vec<u8> {
        self.wire().written.clone()
    }

    /// Written bytes split into CRLF-terminated lines (terminators removed).
    /// An unterminated trailing fragment is omitted.
    pub fn written_lines(&self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.written()).into_owned();
        let mut lines: Vec<String> = text.split("\r\n").map(str::to_string).collect();
        lines.pop();
        lines
    }

    /// Whether `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.wire().shut_down
    }

    fn wire(&self) -> MutexGuard<'_, Wire> {
        self.wire.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &byte in bytes {
            {
                let mut wire = self.wire();
                if wire.fail_writes || wire.shut_down {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "memory transport closed"));
                }
                wire.written.push(byte);
            }
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.wire();
        if wire.inbound.is_empty() {
            return if wire.peer_closed || wire.shut_down {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }
        let n = buf.len().min(wire.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(wire.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.wire().shut_down = true;
        Ok(())
    }
}

/// An [`EventSink`] that records every notification for later assertions.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    changes: Mutex<Vec<(DeviceId, f64)>>,
    batches: Mutex<Vec<String>>,
}

impl RecordingEventSink {
    /// Creates a sink with empty records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(device_id, level)` change received, in order.
    pub fn changes(&self) -> Vec<(DeviceId, f64)> {
        self.changes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every batch description received, in order.
    pub fn batches(&self) -> Vec<String> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl EventSink for RecordingEventSink {
    fn device_changed(&self, device_id: DeviceId, level: f64) {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((device_id, level));
    }

    fn all_devices(&self, batch: &str) {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch.to_string());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
