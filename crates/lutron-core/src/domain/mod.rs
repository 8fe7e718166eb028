//! Domain entities: the device value record and the device-state cache.

pub mod cache;
pub mod device;

pub use cache::DeviceCache;
pub use device::{Device, DeviceId, DEFAULT_ON_LEVEL};
