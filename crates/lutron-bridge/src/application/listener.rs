//! The listener loop: gateway bytes in, cache updates and notifications out.
//!
//! # One iteration
//!
//! ```text
//! drain socket ──► FrameParser::feed ──► for each frame:
//!                                          ├─ DeviceCache::record_level
//!                                          ├─ EventSink::device_changed
//!                                          └─ broadcast DeviceChange
//! sleep(poll_interval)  or wake early if the session state changes
//! ```
//!
//! Every complete frame from one drain is applied before the next drain
//! starts.  A read that yields nothing (a stalled gateway) is not an error;
//! the loop just polls again.  Only the session leaving `Connected` ends it.

use std::sync::Arc;
use std::time::Duration;

use lutron_core::{DeviceCache, Frame, FrameParser};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::application::GatewayLink;
use crate::domain::{BridgeConfig, DeviceChange, EventSink};

/// Owns the frame parser and applies parsed frames to shared state.
pub struct ListenerLoop {
    parser: FrameParser,
    cache: Arc<DeviceCache>,
    sink: Arc<dyn EventSink>,
    changes: broadcast::Sender<DeviceChange>,
    default_on_level: f64,
    publish_changes: bool,
}

impl ListenerLoop {
    /// Creates a listener with a fresh parser.
    pub fn new(
        config: &BridgeConfig,
        cache: Arc<DeviceCache>,
        sink: Arc<dyn EventSink>,
        changes: broadcast::Sender<DeviceChange>,
    ) -> Self {
        Self {
            parser: FrameParser::with_max_pending(config.max_pending_bytes),
            cache,
            sink,
            changes,
            default_on_level: config.default_on_level,
            publish_changes: config.publish_changes,
        }
    }

    /// Feeds one drained chunk through the parser and applies every complete
    /// frame.  Returns the number of frames applied.
    pub fn process(&mut self, bytes: &[u8]) -> usize {
        let frames = self.parser.feed(bytes);
        for frame in &frames {
            self.apply(frame);
        }
        frames.len()
    }

    fn apply(&self, frame: &Frame) {
        if !self.cache.contains(frame.device_id) {
            info!("discovered output {}", frame.device_id);
        }
        let device = self
            .cache
            .record_level(frame.device_id, frame.level, self.default_on_level);
        debug!(
            "device {} now at {:.2} (on level {:.2})",
            device.id, device.current_level, device.on_level
        );

        if self.publish_changes {
            self.sink.device_changed(frame.device_id, frame.level);
        }

        // `send` only fails when nobody is subscribed, which is fine.
        let _ = self.changes.send(DeviceChange {
            device_id: frame.device_id,
            level: frame.level,
        });
    }

    /// Polls `link` until the session is no longer connected.
    ///
    /// Intended to run as a dedicated Tokio task for the lifetime of one
    /// connection.
    pub async fn run(mut self, link: Arc<dyn GatewayLink>, poll_interval: Duration) {
        let mut state = link.watch_state();
        info!("gateway listener started");

        loop {
            let connected = state.borrow_and_update().is_connected();
            if !connected {
                break;
            }

            let bytes = link.read_available().await;
            if !bytes.is_empty() {
                debug!("received {} bytes: {:?}", bytes.len(), String::from_utf8_lossy(&bytes));
                self.process(&bytes);
            }

            // Throttle, but wake immediately on disconnect.
            tokio::select! {
                () = tokio::time::sleep(poll_interval) => {}
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("gateway listener stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::RecordingLink;
    use crate::domain::SessionState;
    use crate::infrastructure::mock::RecordingEventSink;

    struct Fixture {
        listener: ListenerLoop,
        cache: Arc<DeviceCache>,
        sink: Arc<RecordingEventSink>,
        changes: broadcast::Receiver<DeviceChange>,
    }

    fn fixture(config: &BridgeConfig) -> Fixture {
        let cache = Arc::new(DeviceCache::new());
        let sink = Arc::new(RecordingEventSink::new());
        let (tx, rx) = broadcast::channel(16);
        let listener = ListenerLoop::new(config, Arc::clone(&cache), sink.clone(), tx);
        Fixture {
            listener,
            cache,
            sink,
            changes: rx,
        }
    }

    #[test]
    fn test_level_frame_updates_cache_and_notifies_once() {
        // Arrange
        let mut f = fixture(&BridgeConfig::default());

        // Act
        let applied = f.listener.process(b"~OUTPUT,5,1,100.00\r\n");

        // Assert
        assert_eq!(applied, 1);
        assert_eq!(f.cache.get(5).map(|d| d.current_level), Some(100.0));
        assert_eq!(f.sink.changes(), vec![(5, 100.0)]);
        assert_eq!(
            f.changes.try_recv().unwrap(),
            DeviceChange {
                device_id: 5,
                level: 100.0
            }
        );
        assert!(f.changes.try_recv().is_err(), "exactly one change expected");
    }

    #[test]
    fn test_other_actions_leave_cache_untouched() {
        let mut f = fixture(&BridgeConfig::default());

        let applied = f.listener.process(b"~OUTPUT,5,29,6\r\n~OUTPUT,5,2\r\n");

        assert_eq!(applied, 0);
        assert!(f.cache.is_empty());
        assert!(f.sink.changes().is_empty());
        assert!(f.changes.try_recv().is_err());
    }

    #[test]
    fn test_split_frame_is_applied_after_second_chunk() {
        let mut f = fixture(&BridgeConfig::default());

        assert_eq!(f.listener.process(b"~OUTPUT,5,1,10"), 0);
        assert!(f.cache.get(5).is_none());

        assert_eq!(f.listener.process(b"0.00\r\n"), 1);
        assert_eq!(f.cache.get(5).map(|d| d.current_level), Some(100.0));
    }

    #[test]
    fn test_new_device_gets_configured_default_on_level() {
        let config = BridgeConfig {
            default_on_level: 80.0,
            ..Default::default()
        };
        let mut f = fixture(&config);

        f.listener.process(b"~OUTPUT,3,1,0.00\r\n");

        assert_eq!(f.cache.get(3).map(|d| d.on_level), Some(80.0));
    }

    #[test]
    fn test_known_device_keeps_its_on_level_on_later_frames() {
        let mut f = fixture(&BridgeConfig::default());
        f.cache.upsert(lutron_core::Device::new(4, 10.0, 60.0));

        f.listener.process(b"~OUTPUT,4,1,0.00\r\n~OUTPUT,4,1,25.00\r\n");

        let device = f.cache.get(4).unwrap();
        assert_eq!(device.current_level, 25.0);
        assert_eq!(device.on_level, 60.0);
        assert_eq!(f.cache.len(), 1);
    }

    #[test]
    fn test_publish_disabled_still_updates_cache_and_subscribers() {
        // Arrange
        let config = BridgeConfig {
            publish_changes: false,
            ..Default::default()
        };
        let mut f = fixture(&config);

        // Act
        f.listener.process(b"~OUTPUT,5,1,40.00\r\n");

        // Assert
        assert!(f.sink.changes().is_empty());
        assert!(f.cache.contains(5));
        assert!(f.changes.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_run_applies_drained_frames_and_stops_on_disconnect() {
        // Arrange: a link that delivers one frame split over two drains
        let link = Arc::new(RecordingLink::connected());
        link.push_inbound(b"~OUTPUT,7,1,3");
        link.push_inbound(b"0.00\r\n");
        let mut f = fixture(&BridgeConfig::default());
        let listener = f.listener;

        let task = tokio::spawn(listener.run(link.clone(), Duration::from_millis(5)));

        // Act: wait for the change to come through, then disconnect
        let change = tokio::time::timeout(Duration::from_secs(2), f.changes.recv())
            .await
            .expect("change within timeout")
            .unwrap();
        link.set_state(SessionState::Disconnected);

        // Assert
        assert_eq!(change.device_id, 7);
        assert_eq!(change.level, 30.0);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("listener must stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_wakes_on_disconnect_during_long_sleep() {
        let link = Arc::new(RecordingLink::connected());
        let f = fixture(&BridgeConfig::default());

        let task = tokio::spawn(f.listener.run(link.clone(), Duration::from_secs(3600)));
        tokio::task::yield_now().await;
        link.set_state(SessionState::Disconnected);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("listener must not sleep through a disconnect")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_not_connected() {
        let link = Arc::new(RecordingLink::new(SessionState::Disconnected));
        let f = fixture(&BridgeConfig::default());

        tokio::time::timeout(Duration::from_secs(1), f.listener.run(link, Duration::from_secs(60)))
            .await
            .expect("listener must exit at once");
    }
}
