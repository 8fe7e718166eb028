//! # lutron-core
//!
//! Shared library for the Lutron gateway bridge containing the integration
//! protocol framing, outbound command encoding, and the device-state cache.
//!
//! This crate has zero dependencies on sockets, async runtimes, or threads
//! beyond the standard library's synchronization primitives.
//!
//! # Architecture overview (for beginners)
//!
//! A Lutron gateway (RadioRA 2, HomeWorks QS, Caséta Pro) exposes a telnet
//! "integration" port.  After a two-line login, the gateway streams event
//! lines such as `~OUTPUT,5,1,100.00` whenever a light changes, and accepts
//! command lines such as `#OUTPUT,5,1,40.00` to change one.
//!
//! This crate (`lutron-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How lines travel over the wire.  Inbound bytes are
//!   reassembled into [`Frame`]s by the incremental [`FrameParser`]; outbound
//!   [`Command`]s are rendered into protocol lines.  The `D=<id>&L=<level>`
//!   batch grammar used by external callers also lives here.
//!
//! - **`domain`** – The [`Device`] value record and the concurrency-safe
//!   [`DeviceCache`] that remembers the last observed level of every output.

// Rust will look for each module in a subdirectory with the same name
// (e.g., src/protocol/mod.rs).
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `lutron_core::DeviceCache` instead of `lutron_core::domain::cache::DeviceCache`.
pub use domain::cache::DeviceCache;
pub use domain::device::{Device, DeviceId, DEFAULT_ON_LEVEL};
pub use protocol::bulk::{format_change_payload, format_device_states, parse_bulk_state, LevelAssignment};
pub use protocol::command::Command;
pub use protocol::frame::{Frame, FrameError, FrameParser};
