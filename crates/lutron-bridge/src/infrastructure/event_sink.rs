//! Event sink that publishes notifications to the log.
//!
//! Each notification is a topic plus a payload, which is the shape a message
//! bus publisher would want.  Here the "bus" is `tracing` at `info` level.

use lutron_core::{format_change_payload, DeviceId};
use tracing::info;

use crate::domain::EventSink;

/// Topic for single level changes.
pub const DEVICE_CHANGED_TOPIC: &str = "lutron/device/changed";

/// Topic for whole-cache descriptions.
pub const ALL_DEVICES_TOPIC: &str = "lutron/alldevices/state";

/// Logs every notification under its topic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn device_changed(&self, device_id: DeviceId, level: f64) {
        info!(
            topic = DEVICE_CHANGED_TOPIC,
            "{}",
            format_change_payload(device_id, level)
        );
    }

    fn all_devices(&self, batch: &str) {
        info!(topic = ALL_DEVICES_TOPIC, "{}", batch.trim_end());
    }
}
