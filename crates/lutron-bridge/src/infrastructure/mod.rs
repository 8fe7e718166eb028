//! Infrastructure layer for lutron-bridge.
//!
//! The infrastructure layer handles all I/O: the TCP connection to the
//! gateway, config files, and the stdin console.
//!
//! # Responsibilities
//!
//! - Opening the TCP connection and performing the login ([`session`])
//! - Serializing every read and write on that connection ([`session`])
//! - Byte transports, real and in-memory ([`transport`], [`mock`])
//! - Relaying notifications to the log ([`event_sink`])
//! - Loading the TOML config file ([`config_file`])
//! - Driving the operator console over stdin/stdout ([`console`])
//!
//! # What does NOT belong here?
//!
//! - Frame parsing and command formatting (that is `lutron-core`)
//! - Deciding what a frame means for the cache (that is the application layer)

pub mod config_file;
pub mod console;
pub mod event_sink;
pub mod mock;
pub mod session;
pub mod transport;

pub use event_sink::TracingEventSink;
pub use session::Session;
pub use transport::{TcpTransport, Transport};
