//! Notification types delivered to the outside world.
//!
//! Two channels carry notifications out of the bridge:
//!
//! - An [`EventSink`]: the single external collaborator that relays changes
//!   to whatever transport the deployment uses (a cloud publish, MQTT, a log).
//! - Subscribers: any number of in-process observers receiving
//!   [`DeviceChange`] values from `LutronBridge::subscribe`.

use lutron_core::DeviceId;

/// "Output `device_id` is now at `level`", as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceChange {
    pub device_id: DeviceId,
    pub level: f64,
}

/// Receives notifications for delivery outside the process.
///
/// Implementations must return quickly: `device_changed` is called from the
/// listener task between two socket drains.
pub trait EventSink: Send + Sync {
    /// One output changed level.
    fn device_changed(&self, device_id: DeviceId, level: f64);

    /// The full cache was described as `D=<id>&L=<level>` lines.
    fn all_devices(&self, batch: &str);
}
