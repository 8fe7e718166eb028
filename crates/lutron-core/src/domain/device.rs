//! The `Device` value record.
//!
//! The gateway calls every controllable load (a dimmer channel, a switch, a
//! shade motor) an *output*, identified by an integer the installer assigned
//! when programming the system.  The bridge never learns which ids exist; it
//! only remembers the ones it has heard about.

/// Integration id of a gateway output.
///
/// Conventionally in the range `0..90` on a RadioRA 2 main repeater, but the
/// protocol itself places no bound on it.
pub type DeviceId = u32;

/// Level restored when a device first seen through a change frame is turned on.
pub const DEFAULT_ON_LEVEL: f64 = 100.0;

/// Last known state of one gateway output.
///
/// `Device` is a plain value: two devices with the same fields are
/// interchangeable, and there is no identity beyond `id`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Device {
    /// Integration id of the output.
    pub id: DeviceId,
    /// Last observed or commanded brightness, 0.00–100.00.
    pub current_level: f64,
    /// Level to restore when the output is turned on.  Informational only.
    pub on_level: f64,
}

impl Device {
    /// Creates a new device record.
    pub fn new(id: DeviceId, current_level: f64, on_level: f64) -> Self {
        Self {
            id,
            current_level,
            on_level,
        }
    }

    /// Returns `true` when the output is at a non-zero level.
    pub fn is_on(&self) -> bool {
        self.current_level > 0.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_stores_all_fields() {
        // Arrange / Act
        let device = Device::new(7, 30.0, 80.0);

        // Assert
        assert_eq!(device.id, 7);
        assert_eq!(device.current_level, 30.0);
        assert_eq!(device.on_level, 80.0);
    }

    #[test]
    fn test_device_at_zero_is_off() {
        assert!(!Device::new(1, 0.0, DEFAULT_ON_LEVEL).is_on());
    }

    #[test]
    fn test_device_at_partial_level_is_on() {
        assert!(Device::new(1, 0.5, DEFAULT_ON_LEVEL).is_on());
    }
}
