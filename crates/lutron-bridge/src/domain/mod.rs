//! Domain layer for lutron-bridge.
//!
//! The domain layer contains pure types that have no dependencies on I/O,
//! networking, or the async runtime.
//!
//! # What belongs in the domain layer?
//!
//! - Configuration structures
//! - The session state machine
//! - Notification payloads and the event-sink seam
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or file types
//! - Environment variable reading

pub mod config;
pub mod events;
pub mod session_state;

pub use config::BridgeConfig;
pub use events::{DeviceChange, EventSink};
pub use session_state::SessionState;
