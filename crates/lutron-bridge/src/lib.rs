//! lutron-bridge library crate.
//!
//! This crate keeps one telnet integration session open to a Lutron gateway,
//! turns the gateway's event stream into an up-to-date device cache, and lets
//! callers set and query light levels over the same connection.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Caller (set / get / describe / bulk)        Event sink + subscribers
//!         ↓                                            ↑
//! [lutron-bridge]
//!   ├── domain/           Pure types: BridgeConfig, SessionState, DeviceChange, EventSink
//!   ├── application/      CommandTranslator, ListenerLoop, console grammar
//!   ├── infrastructure/
//!   │     ├── transport/  TCP and in-memory byte transports
//!   │     ├── session/    Single serialized connection + login
//!   │     └── config_file/ TOML settings
//!   └── bridge            LutronBridge: wires the layers together
//!         ↕
//! Lutron gateway (telnet integration protocol, port 23)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `lutron-core`; it reaches the
//!   network only through the [`application::GatewayLink`] trait.
//! - `infrastructure` implements that trait on top of `tokio`.

/// Domain layer: configuration, session state, and notification types.
pub mod domain;

/// Application layer: command translation and event processing.
pub mod application;

/// Infrastructure layer: transports, the gateway session, config files, console.
pub mod infrastructure;

/// Composition root: the [`LutronBridge`] facade.
pub mod bridge;

pub use bridge::LutronBridge;
