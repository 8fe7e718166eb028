//! `LutronBridge`: the facade callers hold.
//!
//! It owns one [`Session`], one [`DeviceCache`], the listener task and the
//! command translator, and exposes the caller-facing operations:
//!
//! ```text
//! connect / disconnect / is_connected
//! set_level / query_level / send_raw          ─► Session (serialized writes)
//! initialize_range / apply_bulk_state         ─► Session, paced
//! cached_level / devices / describe_all_devices ─► DeviceCache
//! subscribe                                   ◄─ ListenerLoop broadcast
//! ```
//!
//! The cache outlives connections: after `disconnect` and a later `connect`
//! the previously seen levels are still there.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use lutron_core::{Device, DeviceCache, DeviceId};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::{BridgeError, CommandTranslator, GatewayLink, ListenerLoop};
use crate::domain::{BridgeConfig, DeviceChange, EventSink, SessionState};
use crate::infrastructure::{Session, Transport};

/// A connection to one Lutron gateway plus its device cache.
pub struct LutronBridge {
    config: BridgeConfig,
    session: Arc<Session>,
    cache: Arc<DeviceCache>,
    sink: Arc<dyn EventSink>,
    changes: broadcast::Sender<DeviceChange>,
    translator: CommandTranslator,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl LutronBridge {
    /// Creates a disconnected bridge.  `sink` receives every change
    /// notification and batch description.
    pub fn new(config: BridgeConfig, sink: Arc<dyn EventSink>) -> Self {
        let session = Arc::new(Session::new(config.login_settle));
        let cache = Arc::new(DeviceCache::new());
        let (changes, _) = broadcast::channel(config.event_capacity.max(1));
        let translator = CommandTranslator::new(
            session.clone(),
            Arc::clone(&cache),
            Arc::clone(&sink),
            config.scan_delay,
        );

        Self {
            config,
            session,
            cache,
            sink,
            changes,
            translator,
            listener: Mutex::new(None),
        }
    }

    /// The settings this bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Connects to the configured gateway address.
    ///
    /// # Errors
    ///
    /// See [`LutronBridge::connect_to`].
    pub async fn connect(&self) -> Result<(), BridgeError> {
        self.connect_to(self.config.gateway_addr).await
    }

    /// Connects to `addr`, logs in, and starts the listener task.
    ///
    /// Returns once the login settle delay has passed; commands are accepted
    /// from then on.
    ///
    /// # Errors
    ///
    /// [`BridgeError::AlreadyConnected`] if a session is open, otherwise any
    /// connect or login failure.  The bridge stays disconnected on error.
    pub async fn connect_to(&self, addr: SocketAddr) -> Result<(), BridgeError> {
        let timeout = self.config.connect_timeout;
        self.open(self.session.connect(addr, timeout)).await
    }

    /// Logs in over an already-open transport and starts the listener task.
    ///
    /// # Errors
    ///
    /// [`BridgeError::AlreadyConnected`] if a session is open, or
    /// [`BridgeError::Io`] if the login lines cannot be written.
    pub async fn attach(&self, transport: Box<dyn Transport>) -> Result<(), BridgeError> {
        self.open(self.session.attach(transport)).await
    }

    async fn open<F>(&self, login: F) -> Result<(), BridgeError>
    where
        F: Future<Output = Result<(), BridgeError>>,
    {
        let mut listener = self.listener.lock().await;
        if self.session.state() != SessionState::Disconnected {
            return Err(BridgeError::AlreadyConnected);
        }
        // A listener from a connection the gateway closed may still be winding down.
        if let Some(stale) = listener.take() {
            stale.abort();
            let _ = stale.await;
        }

        login.await?;

        let task = ListenerLoop::new(
            &self.config,
            Arc::clone(&self.cache),
            Arc::clone(&self.sink),
            self.changes.clone(),
        );
        let link: Arc<dyn GatewayLink> = self.session.clone();
        *listener = Some(tokio::spawn(task.run(link, self.config.poll_interval)));
        Ok(())
    }

    /// Closes the session and waits for the listener task to finish.
    /// Calling it while disconnected does nothing.
    pub async fn disconnect(&self) {
        self.session.disconnect().await;
        let task = self.listener.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("listener task ended abnormally: {e}");
            }
        }
        debug!("bridge disconnected");
    }

    /// Whether the session is logged in and accepting commands.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Current session lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// A new receiver for every level change the gateway reports from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceChange> {
        self.changes.subscribe()
    }

    /// Sends `#OUTPUT,<id>,1,<level>`.
    ///
    /// The cache is not touched: it changes only when the gateway reports the
    /// new level back.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotConnected`] or [`BridgeError::Io`].
    pub async fn set_level(&self, device_id: DeviceId, level: f64) -> Result<(), BridgeError> {
        self.translator.set_level(device_id, level).await
    }

    /// Sends `?OUTPUT,<id>,1`; the answer arrives through the cache and
    /// subscribers.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotConnected`] or [`BridgeError::Io`].
    pub async fn query_level(&self, device_id: DeviceId) -> Result<(), BridgeError> {
        self.translator.query_level(device_id).await
    }

    /// Sends an arbitrary protocol line.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotConnected`] or [`BridgeError::Io`].
    pub async fn send_raw(&self, line: &str) -> Result<(), BridgeError> {
        self.translator.send_raw(line).await
    }

    /// Queries ids `0..max_id` to prime the cache.  Returns the number of
    /// queries sent.
    ///
    /// # Errors
    ///
    /// The first failed write.
    pub async fn initialize_range(&self, max_id: DeviceId) -> Result<u32, BridgeError> {
        self.translator.initialize_range(max_id).await
    }

    /// Applies a `D=<id>&L=<level>` batch.  Returns the number of levels sent.
    ///
    /// # Errors
    ///
    /// The first failed write.
    pub async fn apply_bulk_state(&self, spec: &str) -> Result<usize, BridgeError> {
        self.translator.apply_bulk_state(spec).await
    }

    /// Describes every cached device and notifies the event sink.
    pub fn describe_all_devices(&self) -> String {
        self.translator.describe_all_devices()
    }

    /// The cached record for `device_id`, if the gateway has reported it.
    pub fn cached_level(&self, device_id: DeviceId) -> Option<Device> {
        self.cache.get(device_id)
    }

    /// Inserts or replaces a cache entry directly.
    pub fn upsert_device(&self, device: Device) {
        self.cache.upsert(device);
    }

    /// Every cached device in id order.
    pub fn devices(&self) -> Vec<Device> {
        self.cache.snapshot()
    }
}

impl Drop for LutronBridge {
    fn drop(&mut self) {
        if let Some(task) = self.listener.get_mut().take() {
            task.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
