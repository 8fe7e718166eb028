//! In-memory [`GatewayLink`] for application-layer unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use lutron_core::Command;
use tokio::sync::watch;

use crate::application::{BridgeError, GatewayLink};
use crate::domain::SessionState;

/// Records every sent command and replays scripted inbound chunks, one chunk
/// per `read_available` call.
pub(crate) struct RecordingLink {
    sent: Mutex<Vec<String>>,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    state: watch::Sender<SessionState>,
}

impl RecordingLink {
    pub(crate) fn new(state: SessionState) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            state: watch::Sender::new(state),
        }
    }

    pub(crate) fn connected() -> Self {
        Self::new(SessionState::Connected)
    }

    pub(crate) fn push_inbound(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().push_back(bytes.to_vec());
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}

#[async_trait]
impl GatewayLink for RecordingLink {
    async fn send(&self, command: &Command) -> Result<(), BridgeError> {
        if !self.state.borrow().is_connected() {
            return Err(BridgeError::NotConnected);
        }
        self.sent.lock().unwrap().push(command.to_string());
        Ok(())
    }

    async fn read_available(&self) -> Vec<u8> {
        self.inbound.lock().unwrap().pop_front().unwrap_or_default()
    }

    fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
